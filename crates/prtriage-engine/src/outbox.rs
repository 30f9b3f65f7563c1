//! Pending notifications, grouped per channel.

use serde::Serialize;

/// Messages queued for delivery, keyed by channel in first-use order.
///
/// Each channel receives a single text block: its messages joined by a
/// newline, in the order they were queued.
///
/// # Examples
///
/// ```
/// use prtriage_engine::outbox::Outbox;
///
/// let mut outbox = Outbox::new();
/// outbox.push("C-QA", "first\n");
/// outbox.push("U01", "private\n");
/// outbox.push("C-QA", "second\n");
///
/// let blocks: Vec<_> = outbox.blocks().collect();
/// assert_eq!(blocks, vec![
///     ("C-QA", "first\n\nsecond\n".to_string()),
///     ("U01", "private\n".to_string()),
/// ]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outbox {
    channels: Vec<ChannelMessages>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ChannelMessages {
    channel: String,
    messages: Vec<String>,
}

impl Outbox {
    /// An empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `message` for `channel`. Empty messages are ignored.
    pub fn push(&mut self, channel: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        if message.is_empty() {
            return;
        }
        let channel = channel.into();
        match self.channels.iter_mut().find(|c| c.channel == channel) {
            Some(existing) => existing.messages.push(message),
            None => self.channels.push(ChannelMessages {
                channel,
                messages: vec![message],
            }),
        }
    }

    /// Number of channels with at least one message.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Messages queued for `channel`, in order.
    pub fn messages(&self, channel: &str) -> &[String] {
        self.channels
            .iter()
            .find(|c| c.channel == channel)
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    /// The joined text block of each channel, in first-use order.
    pub fn blocks(&self) -> impl Iterator<Item = (&str, String)> {
        self.channels
            .iter()
            .map(|c| (c.channel.as_str(), c.messages.join("\n")))
    }
}
