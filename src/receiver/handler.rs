use std::sync::Arc;

use lambda_http::{Body, Error, Request, Response};
use tracing::warn;

use crate::config::Config;
use crate::dispatch::{Dispatcher, Reply, ReplyBody};
use crate::error::FeedbackError;
use crate::sheets::{FeedbackSink, SheetsClient};
use crate::slack;
use crate::slack_api::{SlackApi, SlackClient};

/// Everything an invocation needs, built once per Lambda container.
pub struct App {
    pub config: Config,
    pub slack: Arc<dyn SlackApi>,
    pub store: Arc<dyn FeedbackSink>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let client = reqwest::Client::new();
        let slack = SlackClient::new(client.clone(), config.slack_bot_token.clone());
        let store = SheetsClient::new(client, config.google.clone());
        Self {
            config,
            slack: Arc::new(slack),
            store: Arc::new(store),
        }
    }
}

fn header<'a>(event: &'a Request, name: &str) -> &'a str {
    event
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

pub async fn function_handler(event: Request, app: &App) -> Result<Response<Body>, Error> {
    let Ok(body_string) = String::from_utf8(event.body().to_vec()) else {
        return Ok(into_response(Reply::bad_request("Body is not valid UTF-8"))?);
    };

    let slack_signature = header(&event, "X-Slack-Signature");
    let slack_timestamp = header(&event, "X-Slack-Request-Timestamp");

    if !slack::verify_slack_signature(
        &app.config.slack_signing_secret,
        &body_string,
        slack_timestamp,
        slack_signature,
    ) {
        return Ok(into_response(Reply::bad_request("Invalid request signature"))?);
    }

    let payload = match slack::parse_payload(&body_string) {
        Ok(payload) => payload,
        Err(FeedbackError::Decode(reason)) => {
            warn!("Rejecting undecodable body: {}", reason);
            return Ok(into_response(Reply::bad_request(reason))?);
        }
        Err(e) => return Err(e.into()),
    };

    let dispatcher = Dispatcher {
        slack: app.slack.as_ref(),
        store: app.store.as_ref(),
        feedback_command: &app.config.feedback_command,
        announce_channel: app.config.feedback_channel.as_deref(),
    };
    let reply = dispatcher.dispatch(payload).await?;

    Ok(into_response(reply)?)
}

pub fn into_response(reply: Reply) -> Result<Response<Body>, lambda_http::http::Error> {
    let builder = Response::builder().status(reply.status);
    match reply.body {
        ReplyBody::Empty => builder.body(Body::Empty),
        ReplyBody::Text(text) => builder
            .header("Content-Type", "text/plain")
            .body(Body::from(text)),
        ReplyBody::Json(value) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(value.to_string())),
    }
}
