use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{FeedbackError, Result};

pub const DEFAULT_FEEDBACK_COMMAND: &str = "/feedback";

/// Process-wide settings, read once at cold start.
#[derive(Clone)]
pub struct Config {
    pub slack_signing_secret: String,
    pub slack_bot_token: String,
    pub feedback_command: String,
    /// Channel notified about each stored submission, if any.
    pub feedback_channel: Option<String>,
    pub google: ServiceAccount,
}

#[derive(Clone)]
pub struct ServiceAccount {
    pub sheet_id: String,
    pub client_email: String,
    pub private_key: String,
}

// Keeps secrets out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feedback_command", &self.feedback_command)
            .field("feedback_channel", &self.feedback_channel)
            .field("sheet_id", &self.google.sheet_id)
            .field("client_email", &self.google.client_email)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| FeedbackError::Config(format!("{key} is not set")))
        };

        Ok(Self {
            slack_signing_secret: required("SLACK_SIGNING_SECRET")?,
            slack_bot_token: required("SLACK_BOT_TOKEN")?,
            feedback_command: lookup("FEEDBACK_COMMAND")
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_FEEDBACK_COMMAND.to_string()),
            feedback_channel: lookup("FEEDBACK_CHANNEL").filter(|value| !value.is_empty()),
            google: ServiceAccount {
                sheet_id: required("GOOGLE_SHEET_ID")?,
                client_email: required("GOOGLE_SERVICE_ACCOUNT_EMAIL")?,
                private_key: normalize_private_key(&required("GOOGLE_PRIVATE_KEY")?)?,
            },
        })
    }
}

/// Accepts a PEM key as-is, with escaped `\n` sequences (the usual shape of a
/// key pasted into an environment variable), or base64-encoded.
pub fn normalize_private_key(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.contains("-----BEGIN") {
        return Ok(trimmed.replace("\\n", "\n"));
    }

    let decoded = STANDARD
        .decode(trimmed)
        .map_err(|e| FeedbackError::Config(format!("GOOGLE_PRIVATE_KEY: {e}")))?;
    let pem = String::from_utf8(decoded)
        .map_err(|e| FeedbackError::Config(format!("GOOGLE_PRIVATE_KEY: {e}")))?;
    if !pem.contains("-----BEGIN") {
        return Err(FeedbackError::Config(
            "GOOGLE_PRIVATE_KEY is not a PEM key".to_string(),
        ));
    }
    Ok(pem)
}
