//! Chat widget controller.
//!
//! Wires message submission, message rendering, role switching and history
//! clearing to a remote HTTP backend serving `/chat`, `/clear` and
//! `/set_role`.
//!
//! # Architecture
//!
//! - **Widget**: one controller per mount, handlers share a conversation log
//! - **Log**: ordered in-memory messages plus live retry countdowns; the only
//!   source of truth for what is displayed
//! - **Surface**: display target that is re-synchronized from the log
//! - **Backend**: async client for the three JSON endpoints
//!
//! # Modules
//!
//! - [`backend`]: backend trait, HTTP client and wire types
//! - [`config`]: layered configuration
//! - [`conversation`]: messages and the conversation log
//! - [`render`]: message to HTML / plain text rendering
//! - [`surface`]: display surfaces
//! - [`widget`]: the controller and its handlers
//!
//! # Trust boundary
//!
//! Message bodies are either [`conversation::Body::Text`], escaped on
//! render, or [`conversation::Body::Markup`], inserted verbatim. Assistant
//! replies (with `reply_format = markup`) and the server welcome message are
//! treated as markup: the backend must sanitize them.

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod render;
pub mod surface;
pub mod widget;

pub use backend::{ChatBackend, HttpBackend};
pub use config::WidgetConfig;
pub use error::{Result, WidgetError};
pub use surface::{HtmlSurface, Surface};
pub use widget::input::{Key, KeyPress};
pub use widget::roles::RoleOutcome;
pub use widget::{ChatWidget, ClearOutcome, SubmitOutcome};
