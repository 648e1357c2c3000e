//! Block Kit fragments for the feedback modal and request messages.
//!
//! Everything here is a pure constructor over `serde_json::Value`.

use serde_json::{json, Value};

pub const FEEDBACK_MODAL_CALLBACK_ID: &str = "feedback_modal";
pub const GIVE_FEEDBACK_ACTION: &str = "give_feedback";

pub const FEEDBACK_BLOCK: &str = "feedback_block";
pub const FEEDBACK_INPUT: &str = "feedback_input";
pub const SATISFACTION_BLOCK: &str = "satisfaction_block";
pub const SATISFACTION_INPUT: &str = "satisfaction_input";
pub const NAME_BLOCK: &str = "name_block";
pub const NAME_INPUT: &str = "name_input";

/// `(label, value)` pairs, least to most satisfied.
pub const SATISFACTION_LEVELS: [(&str, &str); 5] = [
    ("1 = Not at all satisfied", "1"),
    ("2", "2"),
    ("3", "3"),
    ("4", "4"),
    ("5 = Very satisfied", "5"),
];

pub fn plain_text(text: &str) -> Value {
    json!({ "type": "plain_text", "text": text, "emoji": true })
}

pub fn mrkdwn(text: &str) -> Value {
    json!({ "type": "mrkdwn", "text": text })
}

pub fn section(text: &str) -> Value {
    json!({ "type": "section", "text": mrkdwn(text) })
}

pub fn option(label: &str, value: &str) -> Value {
    json!({ "text": plain_text(label), "value": value })
}

fn options(choices: &[(&str, &str)]) -> Vec<Value> {
    choices
        .iter()
        .map(|(label, value)| option(label, value))
        .collect()
}

pub struct TextInput<'a> {
    pub block_id: &'a str,
    pub action_id: &'a str,
    pub label: &'a str,
    pub placeholder: Option<&'a str>,
    pub initial_value: Option<&'a str>,
    pub hint: Option<&'a str>,
    pub multiline: bool,
    pub optional: bool,
}

pub fn text_input(input: &TextInput<'_>) -> Value {
    let mut element = json!({
        "type": "plain_text_input",
        "action_id": input.action_id,
        "multiline": input.multiline,
    });
    if let Some(placeholder) = input.placeholder {
        element["placeholder"] = plain_text(placeholder);
    }
    if let Some(initial) = input.initial_value.filter(|v| !v.is_empty()) {
        element["initial_value"] = Value::from(initial);
    }

    let mut block = json!({
        "type": "input",
        "block_id": input.block_id,
        "optional": input.optional,
        "label": plain_text(input.label),
        "element": element,
    });
    if let Some(hint) = input.hint {
        block["hint"] = plain_text(hint);
    }
    block
}

pub fn radio_group(
    block_id: &str,
    action_id: &str,
    label: &str,
    choices: &[(&str, &str)],
    initial: Option<(&str, &str)>,
) -> Value {
    let mut element = json!({
        "type": "radio_buttons",
        "action_id": action_id,
        "options": options(choices),
    });
    if let Some((initial_label, initial_value)) = initial {
        element["initial_option"] = option(initial_label, initial_value);
    }

    json!({
        "type": "input",
        "block_id": block_id,
        "label": plain_text(label),
        "element": element,
    })
}

/// Dropdown variant of [`radio_group`].
pub fn select(
    block_id: &str,
    action_id: &str,
    label: &str,
    placeholder: &str,
    choices: &[(&str, &str)],
) -> Value {
    json!({
        "type": "input",
        "block_id": block_id,
        "label": plain_text(label),
        "element": {
            "type": "static_select",
            "action_id": action_id,
            "placeholder": plain_text(placeholder),
            "options": options(choices),
        },
    })
}

pub fn button(text: &str, action_id: &str, value: &str) -> Value {
    json!({
        "type": "button",
        "text": plain_text(text),
        "action_id": action_id,
        "value": value,
        "style": "primary",
    })
}

pub fn actions(elements: Vec<Value>) -> Value {
    json!({ "type": "actions", "elements": elements })
}

pub fn modal(callback_id: &str, title: &str, submit: &str, blocks: Vec<Value>) -> Value {
    json!({
        "type": "modal",
        "callback_id": callback_id,
        "title": plain_text(title),
        "submit": plain_text(submit),
        "close": plain_text("Cancel"),
        "blocks": blocks,
    })
}

/// The modal opened by the slash command, the shortcut and the request button.
pub fn feedback_modal(initial_name: Option<&str>) -> Value {
    modal(
        FEEDBACK_MODAL_CALLBACK_ID,
        "Share feedback",
        "Submit",
        vec![
            section("*Experimentation feedback*"),
            radio_group(
                SATISFACTION_BLOCK,
                SATISFACTION_INPUT,
                "How satisfied are you with the support you receive from the team?",
                &SATISFACTION_LEVELS,
                None,
            ),
            text_input(&TextInput {
                block_id: FEEDBACK_BLOCK,
                action_id: FEEDBACK_INPUT,
                label: "Please tell us why you answered the way you did",
                placeholder: Some("It steered us towards success"),
                initial_value: None,
                hint: Some("Your comments will help us improve our process"),
                multiline: true,
                optional: false,
            }),
            text_input(&TextInput {
                block_id: NAME_BLOCK,
                action_id: NAME_INPUT,
                label: "Name",
                placeholder: Some("Leave empty to stay anonymous"),
                initial_value: initial_name,
                hint: None,
                multiline: false,
                optional: true,
            }),
        ],
    )
}

/// DM sent to a user whose feedback was requested.
pub fn feedback_request_message(requester_id: &str) -> Vec<Value> {
    vec![
        section(&format!(
            "<@{requester_id}> would like to hear your feedback. It only takes a minute."
        )),
        actions(vec![button(
            "Give feedback",
            GIVE_FEEDBACK_ACTION,
            GIVE_FEEDBACK_ACTION,
        )]),
    ]
}

pub fn thank_you_message() -> Vec<Value> {
    vec![section(":tada: Thanks! Your feedback has been recorded.")]
}

/// Channel notice posted after a submission is stored.
pub fn feedback_announcement(submitter_id: &str, satisfaction: &str) -> Vec<Value> {
    vec![section(&format!(
        "New feedback from <@{submitter_id}> (satisfaction {satisfaction}/5)"
    ))]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_modal_shape() {
        let view = feedback_modal(None);
        assert_eq!(view["type"], "modal");
        assert_eq!(view["callback_id"], FEEDBACK_MODAL_CALLBACK_ID);
        assert_eq!(view["submit"]["type"], "plain_text");

        let blocks = view["blocks"].as_array().expect("blocks array");
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0]["type"], "section");
        assert_eq!(blocks[1]["block_id"], SATISFACTION_BLOCK);
        assert_eq!(blocks[1]["element"]["type"], "radio_buttons");
        assert_eq!(blocks[1]["element"]["options"][4]["value"], "5");
        assert_eq!(blocks[2]["block_id"], FEEDBACK_BLOCK);
        assert_eq!(blocks[2]["element"]["action_id"], FEEDBACK_INPUT);
        assert_eq!(blocks[2]["element"]["multiline"], true);
        assert_eq!(blocks[2]["hint"]["type"], "plain_text");
        assert_eq!(blocks[3]["optional"], true);
        assert!(blocks[3]["element"].get("initial_value").is_none());
        assert!(blocks[3].get("hint").is_none());
    }

    #[test]
    fn feedback_modal_prefills_name() {
        let view = feedback_modal(Some("alice"));
        assert_eq!(view["blocks"][3]["element"]["initial_value"], "alice");
    }

    #[test]
    fn radio_group_sets_initial_option() {
        let choices = [("One", "1"), ("Two", "2")];
        let block = radio_group("b", "a", "Pick", &choices, Some(("Two", "2")));
        assert_eq!(block["element"]["initial_option"]["value"], "2");
        assert_eq!(block["element"]["options"][0]["text"]["text"], "One");
    }

    #[test]
    fn select_uses_static_select() {
        let block = select("lunch_block", "lunch", "Lunch", "Pick one", &[("Tacos", "tacos")]);
        assert_eq!(block["element"]["type"], "static_select");
        assert_eq!(block["element"]["placeholder"]["text"], "Pick one");
        assert_eq!(block["element"]["options"][0]["value"], "tacos");
    }

    #[test]
    fn request_message_carries_button() {
        let blocks = feedback_request_message("U1");
        assert!(blocks[0]["text"]["text"].as_str().unwrap().contains("<@U1>"));
        assert_eq!(blocks[1]["type"], "actions");
        assert_eq!(blocks[1]["elements"][0]["value"], GIVE_FEEDBACK_ACTION);
    }
}
