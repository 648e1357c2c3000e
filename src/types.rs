use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Slash-command form body. Slack sends every field, but missing ones decode
/// to empty strings.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SlackCommand {
    pub token: String,
    pub team_id: String,
    pub team_domain: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SlackResponse {
    pub response_type: String,
    pub text: String,
}

impl SlackResponse {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: "ephemeral".to_string(),
            text: text.into(),
        }
    }
}

/// Decoded body of an inbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum SlackPayload {
    Command(SlackCommand),
    Interaction(Box<InteractionPayload>),
}

/// Interactivity callback (`block_actions`, `view_submission`, `shortcut`).
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct InteractionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub callback_id: Option<String>,
    pub trigger_id: Option<String>,
    pub user: SlackUser,
    pub view: Option<SlackView>,
    pub actions: Vec<SlackAction>,
    pub container: Option<SlackContainer>,
}

impl InteractionPayload {
    /// Top-level callback id (shortcuts), else the view's (modal events).
    pub fn callback_id(&self) -> Option<&str> {
        self.callback_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.view.as_ref()?.callback_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn first_action_value(&self) -> Option<&str> {
        self.actions.first().and_then(|action| action.value.as_deref())
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SlackUser {
    pub id: String,
    pub username: Option<String>,
    pub name: Option<String>,
}

impl SlackUser {
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SlackView {
    pub callback_id: Option<String>,
    pub state: ViewState,
}

/// `view.state.values.{block_id}.{action_id}`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ViewState {
    pub values: HashMap<String, HashMap<String, StateValue>>,
}

impl ViewState {
    pub fn get(&self, block_id: &str, action_id: &str) -> Option<&StateValue> {
        self.values.get(block_id)?.get(action_id)
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StateValue {
    pub value: Option<String>,
    pub selected_option: Option<SelectedOption>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SelectedOption {
    pub value: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SlackAction {
    pub action_id: Option<String>,
    pub block_id: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SlackContainer {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub channel_id: Option<String>,
    pub message_ts: Option<String>,
}

/// One spreadsheet row. Written once, never read back.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub date: String,
    pub feedback: String,
    pub satisfaction: String,
    pub name: String,
}

impl FeedbackRecord {
    pub const HEADERS: [&'static str; 4] = ["Date", "Feedback", "Satisfaction", "Name"];

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.feedback.clone(),
            self.satisfaction.clone(),
            self.name.clone(),
        ]
    }
}
