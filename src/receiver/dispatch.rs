use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::blocks::{
    self, FEEDBACK_BLOCK, FEEDBACK_INPUT, FEEDBACK_MODAL_CALLBACK_ID, GIVE_FEEDBACK_ACTION,
    NAME_BLOCK, NAME_INPUT, SATISFACTION_BLOCK, SATISFACTION_INPUT,
};
use crate::error::Result;
use crate::sheets::FeedbackSink;
use crate::slack::extract_user_ids;
use crate::slack_api::{ensure_ok, SlackApi};
use crate::types::{
    FeedbackRecord, InteractionPayload, SlackCommand, SlackPayload, SlackResponse, SlackView,
};

pub const FEEDBACK_SHORTCUT_CALLBACK_ID: &str = "feedback_shortcut";
const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, PartialEq)]
pub enum ReplyBody {
    Empty,
    Text(String),
    Json(Value),
}

/// What the HTTP layer sends back to Slack.
#[derive(Debug, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: ReplyBody,
}

impl Reply {
    pub fn ack() -> Self {
        Self {
            status: 200,
            body: ReplyBody::Empty,
        }
    }

    pub fn ephemeral(text: impl Into<String>) -> Self {
        let response = SlackResponse::ephemeral(text);
        Self {
            status: 200,
            body: ReplyBody::Json(json!(response)),
        }
    }

    pub fn bad_request(text: impl Into<String>) -> Self {
        Self {
            status: 400,
            body: ReplyBody::Text(text.into()),
        }
    }
}

pub struct Dispatcher<'a> {
    pub slack: &'a dyn SlackApi,
    pub store: &'a dyn FeedbackSink,
    pub feedback_command: &'a str,
    pub announce_channel: Option<&'a str>,
}

impl Dispatcher<'_> {
    pub async fn dispatch(&self, payload: SlackPayload) -> Result<Reply> {
        match payload {
            SlackPayload::Command(command) if !command.text.trim().is_empty() => {
                Ok(self.request_feedback(&command).await)
            }
            SlackPayload::Command(command) => Ok(self.run_command(&command).await),
            SlackPayload::Interaction(interaction) => self.handle_interaction(&interaction).await,
        }
    }

    /// `/feedback @alice @bob`: DM each mentioned user a request button.
    async fn request_feedback(&self, command: &SlackCommand) -> Reply {
        let user_ids = extract_user_ids(&command.text);
        if user_ids.is_empty() {
            info!("No mentions in command text from {}", command.user_id);
            return Reply::ephemeral(format!(
                "Mention the people you'd like feedback from, e.g. `{} @alice @bob`",
                command.command
            ));
        }

        info!("{} requested feedback from {:?}", command.user_id, user_ids);
        let mut requested = Vec::new();
        for user_id in &user_ids {
            let result = self
                .slack
                .chat_post_message(
                    user_id,
                    "You have a new feedback request",
                    blocks::feedback_request_message(&command.user_id),
                )
                .await;
            if log_slack_result("chat.postMessage", result) {
                requested.push(format!("<@{user_id}>"));
            }
        }

        if requested.is_empty() {
            return Reply::ephemeral("Sorry, the feedback request could not be delivered.");
        }
        Reply::ephemeral(format!("Feedback requested from {}", requested.join(", ")))
    }

    async fn run_command(&self, command: &SlackCommand) -> Reply {
        if command.command != self.feedback_command {
            info!("Unrecognized command {}", command.command);
            return Reply::ephemeral(format!("Command {} not recognized", command.command));
        }

        self.open_feedback_modal(&command.trigger_id, Some(command.user_name.as_str()))
            .await;
        Reply::ack()
    }

    async fn handle_interaction(&self, interaction: &InteractionPayload) -> Result<Reply> {
        match interaction.callback_id() {
            Some(FEEDBACK_MODAL_CALLBACK_ID) if interaction.kind == "view_submission" => {
                return self.submit_feedback(interaction).await;
            }
            Some(FEEDBACK_MODAL_CALLBACK_ID) => {
                // Other events from inside the modal (e.g. view_closed) need no work.
                return Ok(Reply::ack());
            }
            Some(FEEDBACK_SHORTCUT_CALLBACK_ID) => {
                let trigger_id = interaction.trigger_id.as_deref().unwrap_or_default();
                self.open_feedback_modal(trigger_id, Some(interaction.user.display_name()))
                    .await;
                return Ok(Reply::ack());
            }
            _ => {}
        }

        match interaction.first_action_value() {
            Some(GIVE_FEEDBACK_ACTION) => Ok(self.answer_request(interaction).await),
            Some(value) => {
                warn!("Unhandled action value {}", value);
                Ok(Reply::bad_request(format!("Unhandled action: {value}")))
            }
            None => {
                let callback_id = interaction.callback_id().unwrap_or("<none>");
                warn!("Unhandled callback_id {}", callback_id);
                Ok(Reply::bad_request(format!("Unhandled callback_id: {callback_id}")))
            }
        }
    }

    /// "Give feedback" button: open the modal, then remove the request message.
    async fn answer_request(&self, interaction: &InteractionPayload) -> Reply {
        let trigger_id = interaction.trigger_id.as_deref().unwrap_or_default();
        self.open_feedback_modal(trigger_id, Some(interaction.user.display_name()))
            .await;

        let container = interaction.container.as_ref();
        let channel = container.and_then(|c| c.channel_id.as_deref());
        let ts = container.and_then(|c| c.message_ts.as_deref());
        if let (Some(channel), Some(ts)) = (channel, ts) {
            let result = self.slack.chat_delete(channel, ts).await;
            log_slack_result("chat.delete", result);
        }
        Reply::ack()
    }

    async fn submit_feedback(&self, interaction: &InteractionPayload) -> Result<Reply> {
        let default_view = SlackView::default();
        let view = interaction.view.as_ref().unwrap_or(&default_view);

        let record = match feedback_from_view(view) {
            Ok(record) => record,
            Err(errors) => {
                return Ok(Reply {
                    status: 200,
                    body: ReplyBody::Json(json!({ "response_action": "errors", "errors": errors })),
                });
            }
        };

        info!("Recording feedback from {}", interaction.user.id);
        self.store.append(&record).await?;

        let result = self
            .slack
            .chat_post_message(
                &interaction.user.id,
                "Thanks for your feedback!",
                blocks::thank_you_message(),
            )
            .await;
        log_slack_result("chat.postMessage", result);

        if let Some(channel) = self.announce_channel {
            let result = self
                .slack
                .chat_post_message(
                    channel,
                    "New feedback received",
                    blocks::feedback_announcement(&interaction.user.id, &record.satisfaction),
                )
                .await;
            log_slack_result("chat.postMessage", result);
        }

        Ok(Reply::ack())
    }

    async fn open_feedback_modal(&self, trigger_id: &str, user_name: Option<&str>) {
        if trigger_id.is_empty() {
            warn!("Cannot open feedback modal without a trigger_id");
            return;
        }
        let result = self
            .slack
            .views_open(trigger_id, blocks::feedback_modal(user_name))
            .await;
        log_slack_result("views.open", result);
    }
}

/// Logs Slack failures; they are never surfaced to the user.
fn log_slack_result(method: &str, result: Result<Value>) -> bool {
    match result.and_then(|response| ensure_ok(method, response)) {
        Ok(_) => true,
        Err(e) => {
            warn!("{}", e);
            false
        }
    }
}

/// Builds the row from a submitted modal, or returns per-block errors in the
/// shape Slack expects for `response_action: errors`.
pub fn feedback_from_view(view: &SlackView) -> std::result::Result<FeedbackRecord, Value> {
    let state = &view.state;
    let text = |block: &str, action: &str| {
        state
            .get(block, action)
            .and_then(|v| v.value.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };

    let feedback = text(FEEDBACK_BLOCK, FEEDBACK_INPUT);
    let satisfaction = state
        .get(SATISFACTION_BLOCK, SATISFACTION_INPUT)
        .and_then(|v| v.selected_option.as_ref())
        .map(|option| option.value.clone())
        .unwrap_or_default();
    let name = text(NAME_BLOCK, NAME_INPUT);

    let mut errors = serde_json::Map::new();
    if feedback.is_empty() {
        errors.insert(FEEDBACK_BLOCK.to_string(), json!("Please write some feedback"));
    }
    if satisfaction.is_empty() {
        errors.insert(SATISFACTION_BLOCK.to_string(), json!("Please pick a satisfaction level"));
    }
    if !errors.is_empty() {
        return Err(Value::Object(errors));
    }

    Ok(FeedbackRecord {
        date: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        feedback,
        satisfaction,
        name: if name.is_empty() { ANONYMOUS.to_string() } else { name },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(json: Value) -> SlackView {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn record_built_from_view_state() {
        let view = view(json!({
            "callback_id": "feedback_modal",
            "state": { "values": {
                "feedback_block": { "feedback_input": { "type": "plain_text_input", "value": " Loved it " } },
                "satisfaction_block": { "satisfaction_input": {
                    "type": "radio_buttons",
                    "selected_option": { "value": "4", "text": { "type": "plain_text", "text": "4" } }
                } },
                "name_block": { "name_input": { "type": "plain_text_input", "value": "alice" } }
            } }
        }));
        let record = feedback_from_view(&view).unwrap();
        assert_eq!(record.feedback, "Loved it");
        assert_eq!(record.satisfaction, "4");
        assert_eq!(record.name, "alice");
        assert_eq!(record.date.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn empty_name_is_anonymous() {
        let view = view(json!({
            "state": { "values": {
                "feedback_block": { "feedback_input": { "value": "ok" } },
                "satisfaction_block": { "satisfaction_input": { "selected_option": { "value": "3" } } },
                "name_block": { "name_input": { "value": null } }
            } }
        }));
        assert_eq!(feedback_from_view(&view).unwrap().name, ANONYMOUS);
    }

    #[test]
    fn missing_fields_are_reported_per_block() {
        let errors = feedback_from_view(&SlackView::default()).unwrap_err();
        assert!(errors.get(FEEDBACK_BLOCK).is_some());
        assert!(errors.get(SATISFACTION_BLOCK).is_some());
        assert!(errors.get(NAME_BLOCK).is_none());
    }
}
