use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{FeedbackError, Result};

pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack Web API surface used by the dispatcher. Only `call` talks to the
/// network; the named methods build its request bodies.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn call(&self, method: &str, body: Value) -> Result<Value>;

    async fn views_open(&self, trigger_id: &str, view: Value) -> Result<Value> {
        self.call("views.open", json!({ "trigger_id": trigger_id, "view": view }))
            .await
    }

    async fn chat_post_message(&self, channel: &str, text: &str, blocks: Vec<Value>) -> Result<Value> {
        self.call(
            "chat.postMessage",
            json!({ "channel": channel, "text": text, "blocks": blocks }),
        )
        .await
    }

    async fn chat_delete(&self, channel: &str, ts: &str) -> Result<Value> {
        self.call("chat.delete", json!({ "channel": channel, "ts": ts }))
            .await
    }
}

/// Reads Slack's `ok` flag, turning `ok: false` into an error that carries
/// Slack's error code.
pub fn ensure_ok(method: &str, response: Value) -> Result<Value> {
    if response["ok"].as_bool() == Some(true) {
        return Ok(response);
    }
    let code = response["error"].as_str().unwrap_or("unknown_error");
    Err(FeedbackError::SlackApi(format!("{method}: {code}")))
}

pub struct SlackClient {
    client: Client,
    token: String,
    base_url: String,
}

impl SlackClient {
    pub fn new(client: Client, token: String) -> Self {
        Self::with_base_url(client, token, SLACK_API_BASE.to_string())
    }

    pub fn with_base_url(client: Client, token: String, base_url: String) -> Self {
        Self {
            client,
            token,
            base_url,
        }
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn call(&self, method: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&body)
            .send()
            .await?;

        Ok(response.json::<Value>().await?)
    }
}
