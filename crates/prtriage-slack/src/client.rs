use std::time::Duration;

use async_trait::async_trait;
use prtriage_core::{SlackConfig, TriageError};
use prtriage_engine::source::Notifier;
use serde::{Deserialize, Serialize};

/// Body of a `chat.postMessage` call.
///
/// # Examples
///
/// ```
/// use prtriage_slack::PostMessage;
///
/// let msg = PostMessage {
///     channel: "C0123".into(),
///     text: "hello".into(),
/// };
/// let json = serde_json::to_value(&msg).unwrap();
/// assert_eq!(json["channel"], "C0123");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct PostMessage {
    /// Channel id, or a member id for a direct message.
    pub channel: String,
    /// Message text in Slack markup.
    pub text: String,
}

/// Envelope of every Web API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    error: Option<String>,
}

/// Slack Web API client posting messages as the bot user.
///
/// # Examples
///
/// ```
/// use prtriage_core::SlackConfig;
/// use prtriage_slack::SlackClient;
///
/// let client = SlackClient::new(&SlackConfig::default(), Some("xoxb-test")).unwrap();
/// ```
pub struct SlackClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    /// Create a client from an explicit token, the configured one, or the
    /// `SLACK_TOKEN` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] if no token is available, or
    /// [`TriageError::Slack`] if the HTTP client cannot be built.
    pub fn new(config: &SlackConfig, token: Option<&str>) -> Result<Self, TriageError> {
        let token = match token.or(config.token.as_deref()) {
            Some(t) => t.to_string(),
            None => std::env::var("SLACK_TOKEN").map_err(|_| {
                TriageError::Config(
                    "SLACK_TOKEN not set. Pass --slack-token or set SLACK_TOKEN env var".into(),
                )
            })?,
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TriageError::Slack(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Post one message.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Slack`] on HTTP errors or when the API answers
    /// `ok: false`.
    pub async fn post_message(&self, message: &PostMessage) -> Result<(), TriageError> {
        let url = format!("{}/chat.postMessage", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(message)
            .send()
            .await
            .map_err(|e| TriageError::Slack(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(TriageError::Slack(format!(
                "Slack API error {status}: {body_text}"
            )));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| TriageError::Slack(format!("failed to parse response: {e}")))?;
        check_response(body)
    }
}

fn check_response(body: ApiResponse) -> Result<(), TriageError> {
    if body.ok {
        Ok(())
    } else {
        Err(TriageError::Slack(
            body.error.unwrap_or_else(|| "unknown error".into()),
        ))
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn send(&self, channel: &str, text: &str) -> Result<(), TriageError> {
        self.post_message(&PostMessage {
            channel: channel.to_string(),
            text: text.to_string(),
        })
        .await?;
        tracing::info!(%channel, bytes = text.len(), "message posted");
        Ok(())
    }
}
