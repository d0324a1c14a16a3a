//! The chat widget controller.
//!
//! [`ChatWidget`] owns the conversation log and mediates between the user's
//! actions, the backend, and the display surface:
//!
//! - submission: optimistic user message, `/chat` round trip, reply or error
//! - clearing: confirmation, `/clear`, log reset per [`ClearPolicy`]
//! - roles: `/set_role` and the active-role indicator (see [`roles`])
//! - rate limits: per-message countdowns (see [`countdown`])
//! - input ergonomics: auto-grow and Ctrl+Enter (see [`input`])
//!
//! Handlers take `&self`; the widget is a cheap clonable handle, so several
//! submissions may be in flight at once.

pub mod countdown;
pub mod input;
pub mod roles;

#[cfg(test)]
mod testing;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::{ChatBackend, ChatRequest};
use crate::config::{ClearPolicy, OverlapPolicy, ReplyFormat, WidgetConfig};
use crate::conversation::{Author, Body, ConversationLog, Message, MessageId};
use crate::render::render_log;
use crate::surface::Surface;

use input::InputState;
use roles::RoleSelector;

/// Shown by the confirmation prompt before clearing.
pub const CLEAR_PROMPT: &str = "Are you sure you want to clear the chat history?";

/// Shown when `/chat` could not be reached or answered garbage.
pub const TRANSPORT_ERROR_TEXT: &str = "An error occurred while communicating with the server.";

/// Status line rendered after a rebuild-style clear.
pub const CLEARED_TEXT: &str = "Chat history cleared.";

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Input was empty after trimming; nothing happened.
    Ignored,
    /// Another request is in flight and overlap is rejected.
    Busy,
    /// The assistant replied.
    Replied,
    /// The backend reported failure, optionally with a cooldown.
    Rejected { retry_after: Option<u64> },
    /// Transport failure; a generic error was shown.
    Failed,
}

/// How a clear request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The user declined; no request was sent.
    Declined,
    Cleared,
    /// The backend refused or was unreachable. Nothing visible changed.
    Failed,
}

/// Chat widget controller.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use chat_widget::{ChatWidget, HtmlSurface, HttpBackend, WidgetConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = WidgetConfig::load()?;
/// let backend = Arc::new(HttpBackend::from_config(&config.backend)?);
/// let surface = Arc::new(HtmlSurface::new());
///
/// let widget = ChatWidget::new(config, backend, surface.clone());
/// widget.mount();
/// widget.on_input("What is a hash map?");
/// widget.submit().await;
/// println!("{}", surface.log_html());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChatWidget {
    inner: Arc<WidgetInner>,
}

struct WidgetInner {
    config: WidgetConfig,
    backend: Arc<dyn ChatBackend>,
    surface: Arc<dyn Surface>,
    log: RwLock<ConversationLog>,
    input: Mutex<InputState>,
    roles: Mutex<RoleSelector>,
    /// Submissions between the optimistic render and their resolution.
    in_flight: AtomicUsize,
    /// Countdown tasks keyed by the message they update.
    timers: Mutex<HashMap<MessageId, JoinHandle<()>>>,
}

impl std::fmt::Debug for ChatWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatWidget")
            .field("messages", &self.log().len())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

/// Counts a submission as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ChatWidget {
    #[must_use]
    pub fn new(
        config: WidgetConfig,
        backend: Arc<dyn ChatBackend>,
        surface: Arc<dyn Surface>,
    ) -> Self {
        let roles = RoleSelector::new(config.roles.available.clone(), config.initial_role());
        Self {
            inner: Arc::new(WidgetInner {
                config,
                backend,
                surface,
                log: RwLock::new(ConversationLog::new()),
                input: Mutex::new(InputState::default()),
                roles: Mutex::new(roles),
                in_flight: AtomicUsize::new(0),
                timers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Bind to the surface: welcome banner, role controls, empty input.
    pub fn mount(&self) {
        if let Some(banner) = &self.inner.config.display.welcome_banner {
            if self.log().is_empty() {
                self.log_mut()
                    .push_banner(Message::new(Author::System, Body::text(banner.clone())));
            }
        }
        if self.inner.config.roles.enabled {
            self.show_roles();
        }
        self.on_input("");
        self.sync();

        info!(
            name: "widget.mounted",
            roles_enabled = self.inner.config.roles.enabled,
            role = %self.request_role(),
            "Chat widget mounted"
        );
    }

    #[must_use]
    pub fn config(&self) -> &WidgetConfig {
        &self.inner.config
    }

    /// Copy of the conversation log.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.log().messages().to_vec()
    }

    /// Seconds left on a message's countdown, if one is live.
    #[must_use]
    pub fn countdown(&self, id: MessageId) -> Option<u64> {
        self.log().countdown(id)
    }

    /// Number of submissions awaiting a response.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submission
    // ─────────────────────────────────────────────────────────────────────────

    /// Submit whatever is in the input control.
    pub async fn submit(&self) -> SubmitOutcome {
        let text = self.input_text();
        self.submit_text(&text).await
    }

    /// Submit `text` as if it had been typed and sent.
    pub async fn submit_text(&self, text: &str) -> SubmitOutcome {
        let message = text.trim();
        if message.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let Some(_guard) = self.begin_request() else {
            debug!(name: "chat.busy", "Submission rejected while a request is in flight");
            return SubmitOutcome::Busy;
        };

        let role = self.request_role();
        self.append(Message::new(Author::User, Body::text(message)));
        self.on_input("");
        self.inner.surface.set_typing_visible(true);

        info!(name: "chat.submit", role = %role, chars = message.len(), "Submitting message");

        let request = ChatRequest {
            message: message.to_string(),
            role,
        };
        let result = self.inner.backend.chat(&request).await;
        self.inner.surface.set_typing_visible(false);

        match result {
            Ok(reply) if reply.success => {
                info!(name: "chat.reply", chars = reply.response.len(), "Assistant replied");
                let body = match self.inner.config.display.reply_format {
                    ReplyFormat::Markup => Body::trusted_markup(reply.response),
                    ReplyFormat::Text => Body::text(reply.response),
                };
                self.append(Message::new(Author::Assistant, body));
                SubmitOutcome::Replied
            }
            Ok(reply) => {
                warn!(
                    name: "chat.rejected",
                    retry_after = ?reply.retry_after,
                    response = %reply.response,
                    "Backend reported failure"
                );
                match reply.retry_after {
                    Some(secs) => {
                        let id = self.append(Message::rate_limited(reply.response, secs));
                        if self.countdown(id).is_some() {
                            self.start_countdown(id);
                        }
                    }
                    None => {
                        self.append(Message::new(Author::Error, Body::text(reply.response)));
                    }
                }
                SubmitOutcome::Rejected {
                    retry_after: reply.retry_after,
                }
            }
            Err(err) => {
                error!(name: "chat.transport_error", error = %err, "Chat request failed");
                self.append(Message::new(Author::Error, Body::text(TRANSPORT_ERROR_TEXT)));
                SubmitOutcome::Failed
            }
        }
    }

    fn begin_request(&self) -> Option<InFlight<'_>> {
        let counter = &self.inner.in_flight;
        match self.inner.config.submission.overlap {
            OverlapPolicy::Allow => {
                counter.fetch_add(1, Ordering::AcqRel);
            }
            OverlapPolicy::Reject => {
                counter
                    .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                    .ok()?;
            }
        }
        Some(InFlight(counter))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Clearing
    // ─────────────────────────────────────────────────────────────────────────

    /// Clear the history after `confirm` approves [`CLEAR_PROMPT`].
    ///
    /// Failures are logged and leave the display untouched.
    pub async fn clear_history<F>(&self, confirm: F) -> ClearOutcome
    where
        F: FnOnce(&str) -> bool,
    {
        if !confirm(CLEAR_PROMPT) {
            debug!(name: "clear.declined", "Clear declined by user");
            return ClearOutcome::Declined;
        }

        let reply = match self.inner.backend.clear().await {
            Ok(reply) => reply,
            Err(err) => {
                error!(name: "clear.transport_error", error = %err, "Error clearing chat");
                return ClearOutcome::Failed;
            }
        };
        if !reply.success {
            warn!(name: "clear.rejected", "Backend refused to clear chat");
            return ClearOutcome::Failed;
        }

        let removed = {
            let mut log = self.log_mut();
            match self.inner.config.display.clear_policy {
                ClearPolicy::KeepBanner => log.retain_banner(),
                ClearPolicy::Rebuild => {
                    let removed = log.clear();
                    log.push(Message::new(Author::System, Body::text(CLEARED_TEXT)));
                    if let Some(welcome) = reply.welcome_message {
                        log.push(Message::new(Author::System, Body::trusted_markup(welcome)));
                    }
                    removed
                }
            }
        };
        self.cancel_countdowns(&removed);
        self.sync();

        info!(name: "clear.done", removed = removed.len(), "Chat history cleared");
        ClearOutcome::Cleared
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Role label sent with chat requests.
    fn request_role(&self) -> String {
        if self.inner.config.roles.enabled {
            self.roles().active().to_string()
        } else {
            self.inner.config.roles.default_role.clone()
        }
    }

    /// Push a message and re-sync the surface.
    fn append(&self, message: Message) -> MessageId {
        let id = self.log_mut().push(message);
        self.sync();
        id
    }

    /// Re-render the log onto the surface and scroll to the newest entry.
    fn sync(&self) {
        let rendered = render_log(&self.log());
        self.inner.surface.sync_log(&rendered);
        self.inner.surface.scroll_to_bottom();
    }

    fn log(&self) -> RwLockReadGuard<'_, ConversationLog> {
        self.inner.log.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_mut(&self) -> RwLockWriteGuard<'_, ConversationLog> {
        self.inner.log.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn roles(&self) -> MutexGuard<'_, RoleSelector> {
        self.inner.roles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn input(&self) -> MutexGuard<'_, InputState> {
        self.inner.input.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<MessageId, JoinHandle<()>>> {
        self.inner.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ScriptedBackend, test_config};
    use super::*;
    use crate::backend::{ChatReply, ClearReply};
    use crate::error::WidgetError;
    use crate::surface::HtmlSurface;

    fn mounted(config: WidgetConfig, backend: &Arc<ScriptedBackend>) -> (ChatWidget, Arc<HtmlSurface>) {
        let surface = Arc::new(HtmlSurface::new());
        let widget = ChatWidget::new(config, backend.clone(), surface.clone());
        widget.mount();
        (widget, surface)
    }

    fn ok(text: &str) -> ChatReply {
        ChatReply {
            success: true,
            response: text.into(),
            retry_after: None,
        }
    }

    #[tokio::test]
    async fn test_whitespace_submission_is_noop() {
        let backend = Arc::new(ScriptedBackend::default());
        let (widget, surface) = mounted(test_config(), &backend);

        widget.on_input("   \n\t ");
        assert_eq!(widget.submit().await, SubmitOutcome::Ignored);

        assert!(widget.messages().is_empty());
        assert!(surface.snapshot().nodes.is_empty());
        assert_eq!(backend.chat_calls().len(), 0);
    }

    #[tokio::test]
    async fn test_successful_reply() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Ok(ok("Hi")));
        let (widget, surface) = mounted(test_config(), &backend);

        widget.on_input("  Hello there  ");
        assert_eq!(widget.submit().await, SubmitOutcome::Replied);

        let messages = widget.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].author(), Author::User);
        assert_eq!(messages[0].body(), &Body::text("Hello there"));
        assert_eq!(messages[1].author(), Author::Assistant);
        assert_eq!(messages[1].body().raw(), "Hi");

        let state = surface.snapshot();
        assert!(!state.typing_visible);
        assert_eq!(state.input_text, "");
        assert_eq!(state.scrolled_to, Some(messages[1].id()));

        let calls = backend.chat_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].message, "Hello there");
        assert_eq!(calls[0].role, "default");
    }

    #[tokio::test]
    async fn test_reply_format_controls_escaping() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Ok(ok("<b>bold</b>")));
        backend.push_chat(Ok(ok("<b>bold</b>")));

        let (markup, markup_surface) = mounted(test_config(), &backend);
        markup.submit_text("a").await;
        assert!(markup_surface.log_html().contains("<b>bold</b>"));

        let mut config = test_config();
        config.display.reply_format = ReplyFormat::Text;
        let (text, text_surface) = mounted(config, &backend);
        text.submit_text("a").await;
        assert!(text_surface.log_html().contains("&lt;b&gt;bold&lt;/b&gt;"));
    }

    #[tokio::test]
    async fn test_user_message_shown_before_reply() {
        let backend = Arc::new(ScriptedBackend::gated());
        backend.push_chat(Ok(ok("later")));
        let (widget, surface) = mounted(test_config(), &backend);

        widget.on_input("first");
        let task = tokio::spawn({
            let widget = widget.clone();
            async move { widget.submit().await }
        });
        backend.wait_for_chat_call().await;

        let state = surface.snapshot();
        assert_eq!(state.nodes.len(), 1);
        assert_eq!(state.nodes[0].author, Author::User);
        assert_eq!(state.input_text, "");
        assert!(state.typing_visible);
        assert_eq!(widget.in_flight(), 1);

        backend.release();
        assert_eq!(task.await.unwrap(), SubmitOutcome::Replied);
        assert_eq!(widget.in_flight(), 0);
        assert!(!surface.snapshot().typing_visible);
    }

    #[tokio::test]
    async fn test_application_error_without_retry() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Ok(ChatReply {
            success: false,
            response: "Error communicating with the AI service.".into(),
            retry_after: None,
        }));
        let (widget, surface) = mounted(test_config(), &backend);

        let outcome = widget.submit_text("hi").await;
        assert_eq!(outcome, SubmitOutcome::Rejected { retry_after: None });

        let messages = widget.messages();
        assert_eq!(messages[1].author(), Author::Error);
        assert!(surface.log_html().contains("text-danger"));
        assert!(!surface.log_html().contains("retry-countdown"));
    }

    #[tokio::test]
    async fn test_transport_failure_shows_generic_error() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Err(WidgetError::Api {
            status: 502,
            message: "bad gateway".into(),
        }));
        let (widget, surface) = mounted(test_config(), &backend);

        assert_eq!(widget.submit_text("hi").await, SubmitOutcome::Failed);

        let messages = widget.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].body().raw(), TRANSPORT_ERROR_TEXT);
        assert!(!surface.snapshot().typing_visible);
        assert_eq!(widget.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_reject_policy_refuses_overlap() {
        let backend = Arc::new(ScriptedBackend::gated());
        backend.push_chat(Ok(ok("one")));
        let mut config = test_config();
        config.submission.overlap = OverlapPolicy::Reject;
        let (widget, _surface) = mounted(config, &backend);

        let first = tokio::spawn({
            let widget = widget.clone();
            async move { widget.submit_text("one").await }
        });
        backend.wait_for_chat_call().await;

        assert_eq!(widget.submit_text("two").await, SubmitOutcome::Busy);
        assert_eq!(widget.messages().len(), 1);

        backend.release();
        assert_eq!(first.await.unwrap(), SubmitOutcome::Replied);
        assert_eq!(backend.chat_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_allow_policy_overlaps() {
        let backend = Arc::new(ScriptedBackend::gated());
        backend.push_chat(Ok(ok("one")));
        backend.push_chat(Ok(ok("two")));
        let (widget, _surface) = mounted(test_config(), &backend);

        let first = tokio::spawn({
            let widget = widget.clone();
            async move { widget.submit_text("one").await }
        });
        backend.wait_for_chat_call().await;
        let second = tokio::spawn({
            let widget = widget.clone();
            async move { widget.submit_text("two").await }
        });
        backend.wait_for_chat_call().await;
        assert_eq!(widget.in_flight(), 2);

        backend.release();
        backend.release();
        assert_eq!(first.await.unwrap(), SubmitOutcome::Replied);
        assert_eq!(second.await.unwrap(), SubmitOutcome::Replied);
        assert_eq!(widget.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_declined_clear_sends_nothing() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Ok(ok("Hi")));
        let (widget, surface) = mounted(test_config(), &backend);
        widget.submit_text("hello").await;
        let before = surface.snapshot();

        let mut asked = None;
        let outcome = widget
            .clear_history(|prompt| {
                asked = Some(prompt.to_string());
                false
            })
            .await;

        assert_eq!(outcome, ClearOutcome::Declined);
        assert_eq!(asked.as_deref(), Some(CLEAR_PROMPT));
        assert_eq!(backend.clear_calls(), 0);
        assert_eq!(surface.snapshot(), before);
    }

    #[tokio::test]
    async fn test_clear_keep_banner() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Ok(ok("Hi")));
        backend.push_clear(Ok(ClearReply {
            success: true,
            welcome_message: Some("ignored".into()),
        }));
        let mut config = test_config();
        config.display.clear_policy = ClearPolicy::KeepBanner;
        config.display.welcome_banner = Some("Only Computer Science questions.".into());
        let (widget, surface) = mounted(config, &backend);

        widget.submit_text("hello").await;
        assert_eq!(widget.messages().len(), 3);

        assert_eq!(widget.clear_history(|_| true).await, ClearOutcome::Cleared);
        let messages = widget.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body().raw(), "Only Computer Science questions.");
        assert_eq!(surface.snapshot().nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_keep_banner_without_banner() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Ok(ok("Hi")));
        backend.push_clear(Ok(ClearReply {
            success: true,
            welcome_message: None,
        }));
        let mut config = test_config();
        config.display.clear_policy = ClearPolicy::KeepBanner;
        config.display.welcome_banner = None;
        let (widget, surface) = mounted(config, &backend);

        widget.submit_text("secret first question").await;
        assert_eq!(widget.messages().len(), 2);

        assert_eq!(widget.clear_history(|_| true).await, ClearOutcome::Cleared);
        assert!(widget.messages().is_empty());
        assert!(surface.snapshot().nodes.is_empty());
        assert!(!surface.log_html().contains("secret first question"));
    }

    #[tokio::test]
    async fn test_clear_rebuild_with_welcome() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Ok(ok("Hi")));
        backend.push_clear(Ok(ClearReply {
            success: true,
            welcome_message: Some("<i class=\"fas fa-info-circle\"></i> Welcome".into()),
        }));
        let mut config = test_config();
        config.display.welcome_banner = Some("banner".into());
        let (widget, surface) = mounted(config, &backend);
        widget.submit_text("hello").await;

        assert_eq!(widget.clear_history(|_| true).await, ClearOutcome::Cleared);

        let messages = widget.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body(), &Body::text(CLEARED_TEXT));
        assert!(matches!(messages[1].body(), Body::Markup(_)));
        let html = surface.log_html();
        assert!(!html.contains("hello"));
        assert!(!html.contains("banner"));
        assert!(html.contains("<i class=\"fas fa-info-circle\"></i> Welcome"));
    }

    #[tokio::test]
    async fn test_clear_failures_are_silent() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Ok(ok("Hi")));
        backend.push_clear(Ok(ClearReply {
            success: false,
            welcome_message: None,
        }));
        backend.push_clear(Err(WidgetError::Api {
            status: 500,
            message: "boom".into(),
        }));
        let (widget, surface) = mounted(test_config(), &backend);
        widget.submit_text("hello").await;
        let before = surface.snapshot();

        assert_eq!(widget.clear_history(|_| true).await, ClearOutcome::Failed);
        assert_eq!(widget.clear_history(|_| true).await, ClearOutcome::Failed);

        assert_eq!(backend.clear_calls(), 2);
        assert_eq!(surface.snapshot(), before);
        assert_eq!(widget.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_newline_renders_as_break() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Ok(ok("ok")));
        let (widget, surface) = mounted(test_config(), &backend);

        widget.submit_text("line one\nline two").await;

        let user = &surface.snapshot().nodes[0];
        assert!(user.html.contains("line one<br>line two"));
        assert!(!user.html.contains('\n'));
    }
}
