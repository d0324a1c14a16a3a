//! Ordered message log with live retry countdowns.

use std::collections::HashMap;

use super::message::{Message, MessageId};

/// Result of advancing a countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; seconds left.
    Remaining(u64),
    /// Reached zero; the timer is gone.
    Elapsed,
    /// No live timer for that message (never had one, or it was cleared).
    Missing,
}

/// The conversation as the widget shows it.
#[derive(Debug, Default, Clone)]
pub struct ConversationLog {
    messages: Vec<Message>,
    /// Live countdowns keyed by the error message they belong to.
    timers: HashMap<MessageId, u64>,
    /// The welcome banner placed at mount, if any.
    banner: Option<MessageId>,
}

impl ConversationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. A rate-limited message starts its countdown here.
    pub fn push(&mut self, message: Message) -> MessageId {
        let id = message.id();
        if let Some(secs) = message.retry_after().filter(|s| *s > 0) {
            self.timers.insert(id, secs);
        }
        self.messages.push(message);
        id
    }

    /// Append the welcome banner. It is the only message a
    /// [`retain_banner`](Self::retain_banner) keeps.
    pub fn push_banner(&mut self, message: Message) -> MessageId {
        let id = self.push(message);
        self.banner = Some(id);
        id
    }

    /// The welcome banner, while it is still in the log.
    #[must_use]
    pub fn banner(&self) -> Option<&Message> {
        self.banner.and_then(|id| self.get(id))
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Seconds left on a message's countdown, if one is live.
    #[must_use]
    pub fn countdown(&self, id: MessageId) -> Option<u64> {
        self.timers.get(&id).copied()
    }

    /// Number of live countdowns.
    #[must_use]
    pub fn live_countdowns(&self) -> usize {
        self.timers.len()
    }

    /// Advance one message's countdown by a second.
    pub fn tick(&mut self, id: MessageId) -> Tick {
        let Some(remaining) = self.timers.get_mut(&id) else {
            return Tick::Missing;
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.timers.remove(&id);
            Tick::Elapsed
        } else {
            Tick::Remaining(*remaining)
        }
    }

    /// Drop every message. Returns the removed ids.
    pub fn clear(&mut self) -> Vec<MessageId> {
        self.timers.clear();
        self.banner = None;
        self.messages.drain(..).map(|m| m.id()).collect()
    }

    /// Drop everything except the welcome banner. Without a banner this
    /// empties the log. Returns the removed ids.
    pub fn retain_banner(&mut self) -> Vec<MessageId> {
        let banner = self.banner;
        let mut removed = Vec::new();
        self.messages.retain(|m| {
            let keep = Some(m.id()) == banner;
            if !keep {
                removed.push(m.id());
            }
            keep
        });
        for id in &removed {
            self.timers.remove(id);
        }
        removed
    }
}
