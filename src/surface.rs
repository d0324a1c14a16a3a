//! Display surfaces the widget renders to.
//!
//! A [`Surface`] never holds state the widget depends on; it is pushed a full
//! re-render of the log after every change.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::conversation::MessageId;
use crate::render::RenderedMessage;

/// One role control as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOption {
    pub name: String,
    pub active: bool,
}

/// Where the widget draws itself.
pub trait Surface: Send + Sync {
    /// Replace the displayed log with `messages`, in order.
    fn sync_log(&self, messages: &[RenderedMessage]);

    /// Bring the newest message into view.
    fn scroll_to_bottom(&self);

    fn set_typing_visible(&self, visible: bool);

    /// Update the active-role label and the role controls.
    fn show_roles(&self, active: &str, options: &[RoleOption]);

    /// Update the input control's text and height.
    fn set_input(&self, text: &str, height: u32);

    /// Natural height of `text` in the input control, before clamping.
    fn content_height(&self, text: &str, line_height: u32) -> u32 {
        let lines = u32::try_from(text.split('\n').count()).unwrap_or(u32::MAX);
        lines.max(1).saturating_mul(line_height)
    }
}

/// Observable state of an [`HtmlSurface`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlState {
    pub nodes: Vec<RenderedMessage>,
    pub typing_visible: bool,
    /// Message that was last scrolled into view.
    pub scrolled_to: Option<MessageId>,
    pub active_role: Option<String>,
    pub role_options: Vec<RoleOption>,
    pub input_text: String,
    pub input_height: u32,
}

/// In-memory HTML surface.
///
/// Keeps the rendered fragments so they can be served, embedded, or
/// inspected.
#[derive(Debug, Default)]
pub struct HtmlSurface {
    state: Mutex<HtmlState>,
}

impl HtmlSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HtmlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> HtmlState {
        self.state().clone()
    }

    /// The message log as a single HTML fragment.
    #[must_use]
    pub fn log_html(&self) -> String {
        let state = self.state();
        let mut html = String::from(r#"<div id="chat-messages" class="chat-messages">"#);
        for node in &state.nodes {
            html.push_str(&node.html);
        }
        html.push_str("</div>");
        html
    }

    /// Typing indicator fragment, visible or hidden.
    #[must_use]
    pub fn typing_indicator_html(&self) -> String {
        let display = if self.state().typing_visible {
            "flex"
        } else {
            "none"
        };
        format!(r#"<div id="typing-indicator" class="typing-indicator" style="display: {display}"><span></span><span></span><span></span></div>"#)
    }

    /// Role controls fragment; exactly one carries `active`.
    #[must_use]
    pub fn roles_html(&self) -> String {
        let state = self.state();
        let mut html = String::new();
        for option in &state.role_options {
            let class = if option.active {
                "role-btn active"
            } else {
                "role-btn"
            };
            let name = crate::render::escape_html(&option.name);
            html.push_str(&format!(
                r#"<button type="button" class="{class}" data-role="{name}">{name}</button>"#
            ));
        }
        html
    }
}

impl Surface for HtmlSurface {
    fn sync_log(&self, messages: &[RenderedMessage]) {
        self.state().nodes = messages.to_vec();
    }

    fn scroll_to_bottom(&self) {
        let mut state = self.state();
        state.scrolled_to = state.nodes.last().map(|n| n.id);
    }

    fn set_typing_visible(&self, visible: bool) {
        self.state().typing_visible = visible;
    }

    fn show_roles(&self, active: &str, options: &[RoleOption]) {
        let mut state = self.state();
        state.active_role = Some(active.to_string());
        state.role_options = options.to_vec();
    }

    fn set_input(&self, text: &str, height: u32) {
        let mut state = self.state();
        state.input_text = text.to_string();
        state.input_height = height;
    }
}
