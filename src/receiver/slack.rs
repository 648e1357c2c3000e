use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use regex::Regex;
use sha2::Sha256;
use tracing::warn;

use crate::error::{FeedbackError, Result};
use crate::types::{InteractionPayload, SlackCommand, SlackPayload};

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted distance between Slack's timestamp and our clock.
pub const MAX_TIMESTAMP_SKEW_SECS: u64 = 60 * 5;

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@([A-Za-z0-9]+)\|[^>]*>").expect("mention pattern is valid"));

pub fn verify_slack_signature(
    signing_secret: &str,
    body: &str,
    timestamp: &str,
    signature: &str,
) -> bool {
    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(now) => now.as_secs(),
        Err(e) => {
            warn!("System clock is before the epoch: {}", e);
            return false;
        }
    };
    verify_slack_signature_at(signing_secret, body, timestamp, signature, now)
}

pub fn verify_slack_signature_at(
    signing_secret: &str,
    body: &str,
    timestamp: &str,
    signature: &str,
    now: u64,
) -> bool {
    let Ok(request_timestamp) = timestamp.parse::<u64>() else {
        warn!("Missing or malformed X-Slack-Request-Timestamp");
        return false;
    };

    if now.abs_diff(request_timestamp) > MAX_TIMESTAMP_SKEW_SECS {
        warn!("Timestamp out of range, potential replay attack");
        return false;
    }

    let Some(provided) = signature
        .strip_prefix("v0=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
    else {
        warn!("Missing or malformed X-Slack-Signature");
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(signing_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            warn!("Failed to create HMAC: {}", e);
            return false;
        }
    };
    mac.update(format!("v0:{}:{}", timestamp, body).as_bytes());

    if mac.verify_slice(&provided).is_err() {
        warn!("Signature verification failed");
        return false;
    }
    true
}

/// Signs a body the way Slack does.
pub fn compute_slack_signature(signing_secret: &str, body: &str, timestamp: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(signing_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            warn!("Failed to create HMAC: {}", e);
            return String::new();
        }
    };
    mac.update(format!("v0:{}:{}", timestamp, body).as_bytes());
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

/// User ids from `<@ID|name>` mention tokens, in order of first appearance.
pub fn extract_user_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for capture in MENTION.captures_iter(text) {
        let id = &capture[1];
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Decodes a urlencoded request body into a slash command or an
/// interactivity payload.
pub fn parse_payload(body: &str) -> Result<SlackPayload> {
    let params: HashMap<String, String> = serde_urlencoded::from_str(body)?;

    if params.contains_key("text") || params.contains_key("command") {
        let command: SlackCommand = serde_urlencoded::from_str(body)?;
        return Ok(SlackPayload::Command(command));
    }

    let raw = params
        .get("payload")
        .ok_or_else(|| FeedbackError::Decode("body has no command or payload".to_string()))?;
    let interaction: InteractionPayload = serde_json::from_str(raw)
        .map_err(|e| FeedbackError::Decode(format!("payload is not valid JSON: {e}")))?;
    Ok(SlackPayload::Interaction(Box::new(interaction)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const BODY: &str = "token=xyz&command=%2Ffeedback&text=&trigger_id=13345224609.738474920.8088930838d88f008e0";
    const NOW: u64 = 1_531_420_618;

    fn signed(body: &str, timestamp: u64) -> (String, String) {
        let ts = timestamp.to_string();
        let sig = compute_slack_signature(SECRET, body, &ts);
        (ts, sig)
    }

    #[test]
    fn accepts_fresh_correctly_signed_request() {
        let (ts, sig) = signed(BODY, NOW);
        assert!(verify_slack_signature_at(SECRET, BODY, &ts, &sig, NOW));
    }

    #[test]
    fn accepts_small_clock_skew_in_both_directions() {
        let (ts, sig) = signed(BODY, NOW);
        assert!(verify_slack_signature_at(SECRET, BODY, &ts, &sig, NOW + 300));
        assert!(verify_slack_signature_at(SECRET, BODY, &ts, &sig, NOW - 300));
    }

    #[test]
    fn rejects_stale_timestamp_even_with_valid_signature() {
        let (ts, sig) = signed(BODY, NOW);
        assert!(!verify_slack_signature_at(SECRET, BODY, &ts, &sig, NOW + 301));
        assert!(!verify_slack_signature_at(SECRET, BODY, &ts, &sig, NOW + 3600));
    }

    #[test]
    fn rejects_timestamp_from_the_future() {
        let (ts, sig) = signed(BODY, NOW + 301);
        assert!(!verify_slack_signature_at(SECRET, BODY, &ts, &sig, NOW));
    }

    #[test]
    fn any_single_byte_mutation_invalidates_signature() {
        let (ts, sig) = signed(BODY, NOW);
        let bytes = BODY.as_bytes();
        for i in 0..bytes.len() {
            let mut mutated = bytes.to_vec();
            mutated[i] = if mutated[i] == b'a' { b'b' } else { b'a' };
            let mutated = String::from_utf8(mutated).unwrap();
            assert!(
                !verify_slack_signature_at(SECRET, &mutated, &ts, &sig, NOW),
                "mutation at byte {i} was accepted"
            );
        }
    }

    #[test]
    fn rejects_wrong_secret() {
        let (ts, sig) = signed(BODY, NOW);
        assert!(!verify_slack_signature_at("other", BODY, &ts, &sig, NOW));
    }

    #[test]
    fn rejects_malformed_headers() {
        let (ts, sig) = signed(BODY, NOW);
        assert!(!verify_slack_signature_at(SECRET, BODY, "", &sig, NOW));
        assert!(!verify_slack_signature_at(SECRET, BODY, "soon", &sig, NOW));
        assert!(!verify_slack_signature_at(SECRET, BODY, &ts, "", NOW));
        assert!(!verify_slack_signature_at(SECRET, BODY, &ts, &sig[3..], NOW));
        assert!(!verify_slack_signature_at(SECRET, BODY, &ts, "v0=zz", NOW));
    }

    #[test]
    fn signature_has_slack_shape() {
        let sig = compute_slack_signature(SECRET, BODY, "1531420618");
        assert!(sig.starts_with("v0="));
        assert_eq!(sig.len(), 3 + 64);
    }

    #[test]
    fn extracts_user_ids_in_order() {
        assert_eq!(
            extract_user_ids("<@U123|alice> <@U456|bob>"),
            vec!["U123".to_string(), "U456".to_string()]
        );
    }

    #[test]
    fn extracted_user_ids_are_deduplicated() {
        assert_eq!(
            extract_user_ids("<@U456|bob> please, and <@U123|alice> and <@U456|bob> again"),
            vec!["U456".to_string(), "U123".to_string()]
        );
    }

    #[test]
    fn text_without_pipe_mentions_yields_nothing() {
        assert!(extract_user_ids("hello there").is_empty());
        assert!(extract_user_ids("<@U123>").is_empty());
        assert!(extract_user_ids("").is_empty());
    }

    #[test]
    fn parses_slash_command_body() {
        let payload = parse_payload(
            "command=%2Ffeedback&text=%3C%40U1%7Calice%3E&user_id=U9&trigger_id=t.1",
        )
        .unwrap();
        let SlackPayload::Command(command) = payload else {
            panic!("expected a command");
        };
        assert_eq!(command.command, "/feedback");
        assert_eq!(command.text, "<@U1|alice>");
        assert_eq!(command.user_id, "U9");
        assert_eq!(command.trigger_id, "t.1");
        assert_eq!(command.channel_id, "");
    }

    #[test]
    fn parses_interaction_payload() {
        let json = r#"{"type":"block_actions","trigger_id":"t.2","user":{"id":"U1","username":"alice"},
            "actions":[{"action_id":"give_feedback","value":"give_feedback"}],
            "container":{"type":"message","channel_id":"D1","message_ts":"1.2"}}"#;
        let body = serde_urlencoded::to_string([("payload", json)]).unwrap();
        let SlackPayload::Interaction(interaction) = parse_payload(&body).unwrap() else {
            panic!("expected an interaction");
        };
        assert_eq!(interaction.kind, "block_actions");
        assert_eq!(interaction.first_action_value(), Some("give_feedback"));
        assert_eq!(interaction.callback_id(), None);
        assert_eq!(interaction.user.display_name(), "alice");
    }

    #[test]
    fn top_level_callback_id_wins_over_view() {
        let json = r#"{"type":"shortcut","callback_id":"feedback_shortcut",
            "view":{"callback_id":"feedback_modal"},"user":{"id":"U1"}}"#;
        let body = serde_urlencoded::to_string([("payload", json)]).unwrap();
        let SlackPayload::Interaction(interaction) = parse_payload(&body).unwrap() else {
            panic!("expected an interaction");
        };
        assert_eq!(interaction.callback_id(), Some("feedback_shortcut"));
    }

    #[test]
    fn rejects_body_without_command_or_payload() {
        assert!(matches!(
            parse_payload("foo=bar"),
            Err(FeedbackError::Decode(_))
        ));
        assert!(matches!(
            parse_payload("payload=not-json"),
            Err(FeedbackError::Decode(_))
        ));
    }
}
