//! Slack feedback receiver.
//!
//! A single HTTP Lambda that verifies Slack requests, opens a feedback modal
//! for slash commands, shortcuts and request buttons, and appends submitted
//! feedback to a Google Sheet.

#[path = "../types.rs"]
pub mod types;

pub mod blocks;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod sheets;
pub mod slack;
pub mod slack_api;

/// Plain-text logs filtered by `RUST_LOG`; CloudWatch supplies timestamps.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();
}
