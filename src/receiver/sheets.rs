//! Google Sheets backed feedback store.
//!
//! Each append authenticates as a service account (RS256 JWT assertion
//! exchanged for an access token), resolves the first sheet of the
//! spreadsheet, makes sure the header row exists and appends one row.

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::ServiceAccount;
use crate::error::{FeedbackError, Result};
use crate::types::FeedbackRecord;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Destination for submitted feedback.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn append(&self, record: &FeedbackRecord) -> Result<()>;
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(client_email: &str, issued_at: i64) -> Self {
        Self {
            iss: client_email.to_string(),
            scope: SHEETS_SCOPE.to_string(),
            aud: GOOGLE_TOKEN_URL.to_string(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, PartialEq)]
pub enum HeaderRow {
    Missing,
    Present,
    Different(Vec<String>),
}

/// Classifies the `values` of a `values.get` response for row 1.
pub fn header_row_state(response: &Value) -> HeaderRow {
    let first_row: Vec<String> = response["values"][0]
        .as_array()
        .map(|cells| {
            cells
                .iter()
                .map(|cell| cell.as_str().unwrap_or_default().trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    if first_row.iter().all(|cell| cell.is_empty()) {
        HeaderRow::Missing
    } else if first_row.iter().map(String::as_str).eq(FeedbackRecord::HEADERS) {
        HeaderRow::Present
    } else {
        HeaderRow::Different(first_row)
    }
}

/// A1 range covering the four record columns, with the sheet title quoted.
pub fn a1_range(sheet_title: &str) -> String {
    format!("'{}'!A1:D1", sheet_title.replace('\'', "''"))
}

pub fn first_sheet_title(metadata: &Value) -> Result<String> {
    metadata["sheets"][0]["properties"]["title"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FeedbackError::SheetsApi("spreadsheet has no sheets".to_string()))
}

pub struct SheetsClient {
    client: Client,
    account: ServiceAccount,
    token_url: String,
    api_base: String,
}

impl SheetsClient {
    pub fn new(client: Client, account: ServiceAccount) -> Self {
        Self::with_endpoints(
            client,
            account,
            GOOGLE_TOKEN_URL.to_string(),
            SHEETS_API_BASE.to_string(),
        )
    }

    pub fn with_endpoints(
        client: Client,
        account: ServiceAccount,
        token_url: String,
        api_base: String,
    ) -> Self {
        Self {
            client,
            account,
            token_url,
            api_base,
        }
    }

    async fn access_token(&self) -> Result<String> {
        let claims = Claims::new(&self.account.client_email, chrono::Utc::now().timestamp());
        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        let response = self
            .client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(FeedbackError::GoogleAuth(error_text));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// `{api_base}/{sheet_id}/{segments...}`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| FeedbackError::Config(format!("Sheets API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FeedbackError::Config("Sheets API base URL cannot have a path".to_string()))?
            .push(&self.account.sheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn send_checked(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(FeedbackError::SheetsApi(error_text));
        }
        Ok(response.json().await?)
    }

    async fn load_sheet_title(&self, token: &str) -> Result<String> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let metadata = self
            .send_checked(self.client.get(url).bearer_auth(token))
            .await?;
        first_sheet_title(&metadata)
    }

    async fn ensure_header_row(&self, token: &str, range: &str) -> Result<()> {
        let current = self
            .send_checked(self.client.get(self.url(&["values", range])?).bearer_auth(token))
            .await?;

        match header_row_state(&current) {
            HeaderRow::Present => Ok(()),
            HeaderRow::Different(found) => {
                warn!("Sheet header row is {:?}, leaving it untouched", found);
                Ok(())
            }
            HeaderRow::Missing => {
                info!("Writing header row to {}", range);
                let mut url = self.url(&["values", range])?;
                url.query_pairs_mut().append_pair("valueInputOption", "RAW");
                self.send_checked(
                    self.client
                        .put(url)
                        .bearer_auth(token)
                        .json(&json!({ "values": [FeedbackRecord::HEADERS] })),
                )
                .await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl FeedbackSink for SheetsClient {
    async fn append(&self, record: &FeedbackRecord) -> Result<()> {
        let token = self.access_token().await?;
        let title = self.load_sheet_title(&token).await?;
        let range = a1_range(&title);
        self.ensure_header_row(&token, &range).await?;

        let append_range = format!("{range}:append");
        let mut url = self.url(&["values", append_range.as_str()])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        self.send_checked(
            self.client
                .post(url)
                .bearer_auth(&token)
                .json(&json!({ "values": [record.to_row()] })),
        )
        .await?;

        info!("Appended feedback row to sheet {}", title);
        Ok(())
    }
}
