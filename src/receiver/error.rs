use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Missing or invalid configuration: {0}")]
    Config(String),

    #[error("Failed to decode request body: {0}")]
    Decode(String),

    #[error("Failed to send HTTP request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Slack API error: {0}")]
    SlackApi(String),

    #[error("Google authentication failed: {0}")]
    GoogleAuth(String),

    #[error("Sheets API error: {0}")]
    SheetsApi(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<jsonwebtoken::errors::Error> for FeedbackError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        FeedbackError::GoogleAuth(error.to_string())
    }
}

impl From<serde_urlencoded::de::Error> for FeedbackError {
    fn from(error: serde_urlencoded::de::Error) -> Self {
        FeedbackError::Decode(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeedbackError>;
