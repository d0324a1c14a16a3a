//! Scripted backend and config fixtures for widget unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::backend::{
    ChatBackend, ChatReply, ChatRequest, ClearReply, SetRoleReply, SetRoleRequest,
};
use crate::config::{
    BackendConfig, ClearPolicy, DisplayConfig, OverlapPolicy, ReplyFormat, RolesConfig,
    SubmissionConfig, WidgetConfig,
};
use crate::error::{Result, WidgetError};

pub(crate) fn test_config() -> WidgetConfig {
    WidgetConfig {
        backend: BackendConfig {
            base_url: "http://127.0.0.1:5000".into(),
            timeout_secs: 5,
        },
        roles: RolesConfig {
            enabled: false,
            default_role: "default".into(),
            available: Vec::new(),
            initial: None,
        },
        display: DisplayConfig {
            reply_format: ReplyFormat::Markup,
            clear_policy: ClearPolicy::Rebuild,
            input_max_height: 150,
            line_height: 24,
            welcome_banner: None,
        },
        submission: SubmissionConfig {
            overlap: OverlapPolicy::Allow,
        },
    }
}

pub(crate) fn roles_config(roles: &[&str]) -> WidgetConfig {
    let mut config = test_config();
    config.roles.enabled = true;
    config.roles.available = roles.iter().map(ToString::to_string).collect();
    config
}

/// Backend that answers from queues and records what it was sent.
///
/// A gated backend holds every `/chat` call until [`ScriptedBackend::release`].
#[derive(Debug)]
pub(crate) struct ScriptedBackend {
    gated: bool,
    chat_replies: Mutex<VecDeque<Result<ChatReply>>>,
    clear_replies: Mutex<VecDeque<Result<ClearReply>>>,
    role_replies: Mutex<VecDeque<Result<SetRoleReply>>>,
    chat_calls: Mutex<Vec<ChatRequest>>,
    clear_calls: Mutex<usize>,
    role_calls: Mutex<Vec<String>>,
    called: Semaphore,
    gate: Semaphore,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            gated: false,
            chat_replies: Mutex::default(),
            clear_replies: Mutex::default(),
            role_replies: Mutex::default(),
            chat_calls: Mutex::default(),
            clear_calls: Mutex::default(),
            role_calls: Mutex::default(),
            called: Semaphore::new(0),
            gate: Semaphore::new(0),
        }
    }
}

impl ScriptedBackend {
    pub(crate) fn gated() -> Self {
        Self {
            gated: true,
            ..Self::default()
        }
    }

    pub(crate) fn push_chat(&self, reply: Result<ChatReply>) {
        self.chat_replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_clear(&self, reply: Result<ClearReply>) {
        self.clear_replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_role(&self, reply: Result<SetRoleReply>) {
        self.role_replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn chat_calls(&self) -> Vec<ChatRequest> {
        self.chat_calls.lock().unwrap().clone()
    }

    pub(crate) fn clear_calls(&self) -> usize {
        *self.clear_calls.lock().unwrap()
    }

    pub(crate) fn role_calls(&self) -> Vec<String> {
        self.role_calls.lock().unwrap().clone()
    }

    /// Wait until a `/chat` call has arrived.
    pub(crate) async fn wait_for_chat_call(&self) {
        self.called.acquire().await.unwrap().forget();
    }

    /// Let one held `/chat` call answer.
    pub(crate) fn release(&self) {
        self.gate.add_permits(1);
    }

    fn exhausted() -> WidgetError {
        WidgetError::Api {
            status: 599,
            message: "no scripted reply".into(),
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.chat_calls.lock().unwrap().push(request.clone());
        let reply = self.chat_replies.lock().unwrap().pop_front();
        self.called.add_permits(1);
        if self.gated {
            self.gate.acquire().await.unwrap().forget();
        }
        reply.unwrap_or_else(|| Err(Self::exhausted()))
    }

    async fn clear(&self) -> Result<ClearReply> {
        *self.clear_calls.lock().unwrap() += 1;
        let reply = self.clear_replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Err(Self::exhausted()))
    }

    async fn set_role(&self, request: &SetRoleRequest) -> Result<SetRoleReply> {
        self.role_calls.lock().unwrap().push(request.role.clone());
        let reply = self.role_replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Err(Self::exhausted()))
    }
}
