//! Append-only conversation transcript.

use serde::{Deserialize, Serialize};
use tk_protocol::message_models::{HandoffTarget, Message};

/// The ordered list of messages of one run.
///
/// Messages are only ever appended; an appended message is never edited or
/// removed. History windowing produces a view via [`Transcript::window`] and
/// leaves the stored messages untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its index.
    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent `limit` messages, oldest first. `None` means everything.
    pub fn window(&self, limit: Option<usize>) -> &[Message] {
        match limit {
            Some(n) if n < self.messages.len() => &self.messages[self.messages.len() - n..],
            _ => &self.messages,
        }
    }

    /// Source of every completed agent turn, in order.
    ///
    /// A turn is completed by assistant text or a hand-off; tool calls and
    /// tool results in between do not count.
    pub fn agent_turn_sources(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.ends_turn())
            .filter_map(Message::source_name)
            .collect()
    }

    /// Most recent message that completed an agent turn.
    pub fn last_agent_turn(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.ends_turn())
    }

    /// Most recent hand-off, with the name of whoever made it.
    pub fn last_handoff(&self) -> Option<(&str, &HandoffTarget)> {
        self.messages.iter().rev().find_map(|m| {
            m.target()
                .map(|target| (m.source_name().unwrap_or_default(), target))
        })
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
