//! Slack delivery for triage notifications.

mod client;

pub use client::{PostMessage, SlackClient};
