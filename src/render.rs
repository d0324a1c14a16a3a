//! Rendering of log messages into display fragments.
//!
//! Each message renders to an HTML fragment (for DOM-like surfaces) and a
//! plain-text line (for terminals). Rendering is pure: the same log always
//! produces the same fragments.

use chrono::{DateTime, Utc};

use crate::conversation::{Author, Body, ConversationLog, Message, MessageId};

/// Replaces the countdown once it reaches zero.
pub const TRY_AGAIN_TEXT: &str = "You may try again now.";

/// A message ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    /// HTML fragment for the message node.
    pub html: String,
    /// Terminal rendering of the same message.
    pub plain: String,
}

/// Escape the five HTML-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape `text` and turn each line break into `<br>`.
#[must_use]
pub fn text_to_html(text: &str) -> String {
    escape_html(text)
        .replace("\r\n", "<br>")
        .replace(['\n', '\r'], "<br>")
}

/// Inner HTML of a body, honoring the text/markup distinction.
#[must_use]
pub fn body_html(body: &Body) -> String {
    match body {
        Body::Text(text) => text_to_html(text),
        Body::Markup(markup) => markup.as_str().to_string(),
    }
}

fn countdown_text(countdown: Option<u64>) -> String {
    match countdown {
        Some(secs) => format!("Retry in {secs}s"),
        None => TRY_AGAIN_TEXT.to_string(),
    }
}

fn countdown_html(countdown: Option<u64>) -> String {
    match countdown {
        Some(secs) => format!(
            r#"<div class="retry-countdown">Retry in <span class="countdown-seconds">{secs}</span>s</div>"#
        ),
        None => format!(r#"<div class="retry-countdown">{TRY_AGAIN_TEXT}</div>"#),
    }
}

/// Render one message. `countdown` is the live seconds left, if any.
#[must_use]
pub fn render_message(message: &Message, countdown: Option<u64>) -> RenderedMessage {
    let id = message.id();
    let author = message.author();
    let mut content = body_html(message.body());
    let mut plain = message.body().raw().to_string();

    if message.retry_after().is_some() {
        content.push_str(&countdown_html(countdown));
        plain.push_str(" (");
        plain.push_str(&countdown_text(countdown));
        plain.push(')');
    }

    let html = match author {
        Author::User | Author::Assistant => {
            let class = if author == Author::User {
                "user-message"
            } else {
                "assistant-message"
            };
            let label = author.label().unwrap_or_default();
            format!(
                r#"<div class="chat-message {class}" data-message-id="{id}"><div class="message-header"><strong>{label}</strong></div><div class="message-content">{content}</div></div>"#
            )
        }
        Author::System => format!(
            r#"<div class="chat-message system-message" data-message-id="{id}"><div class="message-content">{content}</div></div>"#
        ),
        Author::Error => format!(
            r#"<div class="chat-message system-message" data-message-id="{id}"><div class="message-content text-danger">{content}</div></div>"#
        ),
    };

    let plain = match author.label() {
        Some(label) => format!("{label}: {plain}"),
        None if author == Author::Error => format!("! {plain}"),
        None => format!("* {plain}"),
    };

    RenderedMessage {
        id,
        author,
        created_at: message.created_at(),
        html,
        plain,
    }
}

/// Render the whole log in order.
#[must_use]
pub fn render_log(log: &ConversationLog) -> Vec<RenderedMessage> {
    log.messages()
        .iter()
        .map(|m| render_message(m, log.countdown(m.id())))
        .collect()
}
