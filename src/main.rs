//! Terminal front-end for the chat widget.
//!
//! Plain lines are sent as messages. Commands: `/clear`, `/role <name>`,
//! `/roles`, `/quit`.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chat_widget::conversation::MessageId;
use chat_widget::render::RenderedMessage;
use chat_widget::surface::RoleOption;
use chat_widget::widget::CLEAR_PROMPT;
use chat_widget::{ChatWidget, HttpBackend, RoleOutcome, SubmitOutcome, Surface, WidgetConfig};
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Prints log changes to stdout as they happen.
#[derive(Debug, Default)]
struct TerminalSurface {
    /// Last printed text per message, to print only what changed.
    printed: Mutex<HashMap<MessageId, String>>,
}

impl Surface for TerminalSurface {
    fn sync_log(&self, messages: &[RenderedMessage]) {
        let mut printed = self.printed.lock().unwrap_or_else(PoisonError::into_inner);
        if printed.keys().any(|id| !messages.iter().any(|m| m.id == *id)) {
            println!("──────── history cleared ────────");
            printed.clear();
        }
        for message in messages {
            if printed.get(&message.id) != Some(&message.plain) {
                println!("[{}] {}", message.created_at.format("%H:%M:%S"), message.plain);
                printed.insert(message.id, message.plain.clone());
            }
        }
    }

    fn scroll_to_bottom(&self) {}

    fn set_typing_visible(&self, visible: bool) {
        if visible {
            println!("  (assistant is typing…)");
        }
    }

    fn show_roles(&self, active: &str, options: &[RoleOption]) {
        let names: Vec<String> = options
            .iter()
            .map(|o| {
                if o.active {
                    format!("[{}]", o.name)
                } else {
                    o.name.clone()
                }
            })
            .collect();
        println!("Active role: {active}  {}", names.join(" "));
    }

    fn set_input(&self, _text: &str, _height: u32) {}
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send(String),
    Clear,
    Role(String),
    /// `/role` without a name.
    RoleUsage,
    Roles,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.split_once(' ') {
            Some(("/role", name)) => Self::Role(name.trim().to_string()),
            _ => match trimmed {
                "/clear" => Self::Clear,
                "/role" => Self::RoleUsage,
                "/roles" => Self::Roles,
                "/quit" | "/exit" => Self::Quit,
                _ => Self::Send(line.to_string()),
            },
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Wait for every spawned submission. Returns how many finished cleanly.
async fn drain(pending: &mut JoinSet<SubmitOutcome>) -> usize {
    let mut finished = 0;
    while let Some(joined) = pending.join_next().await {
        match joined {
            Ok(_) => finished += 1,
            Err(err) => error!(name: "chat.task_failed", error = %err, "Submission task failed"),
        }
    }
    finished
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = WidgetConfig::load()?;
    let backend = Arc::new(HttpBackend::from_config(&config.backend)?);

    info!(
        name: "widget.config.loaded",
        base_url = %backend.base_url(),
        roles_enabled = config.roles.enabled,
        "Widget configuration loaded"
    );

    let widget = ChatWidget::new(config, backend, Arc::new(TerminalSurface::default()));
    widget.mount();

    let mut pending = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::Clear => {
                println!("{CLEAR_PROMPT} [y/N]");
                let answer = lines.next_line().await?.unwrap_or_default();
                let confirmed = is_yes(&answer);
                widget.clear_history(|_| confirmed).await;
            }
            Command::RoleUsage => println!("Usage: /role <name>"),
            Command::Role(name) => match widget.select_role(&name).await {
                RoleOutcome::Disabled => println!("Role selection is disabled."),
                RoleOutcome::Unknown => println!("Unknown role: {name}"),
                RoleOutcome::Changed | RoleOutcome::Failed => {}
            },
            Command::Roles => {
                let roles = &widget.config().roles;
                if roles.enabled {
                    println!("Roles: {}", roles.available.join(", "));
                    println!("Active: {}", widget.active_role());
                } else {
                    println!("Role selection is disabled (using \"{}\").", roles.default_role);
                }
            }
            Command::Send(text) => {
                // Submissions may overlap; see `submission.overlap`.
                let widget = widget.clone();
                pending.spawn(async move { widget.submit_text(&text).await });
                while pending.try_join_next().is_some() {}
            }
        }
    }

    // Let in-flight replies land before the runtime shuts down.
    drain(&mut pending).await;
    Ok(())
}
