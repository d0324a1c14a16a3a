//! In-memory conversation log.
//!
//! The log is the single source of truth for what the widget shows. Every
//! change is followed by a re-sync of the display surface.
//!
//! # Example
//!
//! ```rust
//! use chat_widget::conversation::{Author, Body, ConversationLog, Message};
//!
//! let mut log = ConversationLog::new();
//! log.push(Message::new(Author::User, Body::text("Hello!")));
//! assert_eq!(log.len(), 1);
//! ```

mod log;
mod message;

pub use log::{ConversationLog, Tick};
pub use message::{Author, Body, Message, MessageId, TrustedMarkup};
