//! Messages and their bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique message identifier.
pub type MessageId = Uuid;

/// Who a message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
    System,
    Error,
}

impl Author {
    /// Header label shown above the message, if any.
    #[must_use]
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::User => Some("You"),
            Self::Assistant => Some("Assistant"),
            Self::System | Self::Error => None,
        }
    }
}

/// Markup that is inserted into the display without escaping.
///
/// Whoever constructs one vouches that it is already sanitized. Backend
/// replies are the only source in this crate; the server is responsible for
/// their safety.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedMarkup(String);

impl TrustedMarkup {
    /// Wrap markup from a trusted origin.
    pub fn from_trusted_source(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Message content, typed by how it must be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Body {
    /// Plain text; escaped and newline-converted when rendered.
    Text(String),
    /// Pre-formatted markup; inserted verbatim.
    Markup(TrustedMarkup),
}

impl Body {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Body whose content is trusted markup. See [`TrustedMarkup`].
    pub fn trusted_markup(markup: impl Into<String>) -> Self {
        Self::Markup(TrustedMarkup::from_trusted_source(markup))
    }

    /// Raw content without any rendering applied.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Markup(markup) => markup.as_str(),
        }
    }
}

/// A rendered conversation entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    author: Author,
    body: Body,
    created_at: DateTime<Utc>,
    /// Rate-limit cooldown this message announces, in seconds.
    retry_after: Option<u64>,
}

impl Message {
    #[must_use]
    pub fn new(author: Author, body: Body) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            body,
            created_at: Utc::now(),
            retry_after: None,
        }
    }

    /// Error message carrying a retry countdown.
    #[must_use]
    pub fn rate_limited(text: impl Into<String>, retry_after: u64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(Author::Error, Body::text(text))
        }
    }

    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub fn author(&self) -> Author {
        self.author
    }

    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        self.retry_after
    }
}
