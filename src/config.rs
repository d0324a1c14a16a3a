//! Layered widget configuration.
//!
//! Priority (lowest to highest): built-in defaults, config file, `CHAT_WIDGET_`
//! environment variables, CLI flags.

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Config file looked up in the working directory when none is given.
const DEFAULT_CONFIG_BASENAME: &str = "chat-widget";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Backend base URL (serves /chat, /clear and /set_role)
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Enable role selection
    #[arg(long)]
    pub roles_enabled: Option<bool>,

    /// Role to start with
    #[arg(long)]
    pub role: Option<String>,

    /// Overlapping submissions: "allow" or "reject"
    #[arg(long)]
    pub overlap: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    pub backend: BackendConfig,
    pub roles: RolesConfig,
    pub display: DisplayConfig,
    pub submission: SubmissionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RolesConfig {
    pub enabled: bool,
    /// Label sent with every chat request when role selection is disabled.
    pub default_role: String,
    #[serde(default)]
    pub available: Vec<String>,
    #[serde(default)]
    pub initial: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    pub reply_format: ReplyFormat,
    pub clear_policy: ClearPolicy,
    pub input_max_height: u32,
    pub line_height: u32,
    #[serde(default)]
    pub welcome_banner: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    pub overlap: OverlapPolicy,
}

/// How assistant replies from `/chat` are treated at the render boundary.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReplyFormat {
    /// Replies are server-sanitized markup, inserted verbatim.
    Markup,
    /// Replies are plain text, escaped and newline-converted.
    Text,
}

/// What a successful `/clear` does to the log.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ClearPolicy {
    /// Keep the first message (welcome banner), drop everything after it.
    KeepBanner,
    /// Drop everything, then render a status line and the server welcome.
    Rebuild,
}

/// Whether a submission may start while another is in flight.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    Allow,
    Reject,
}

impl WidgetConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("backend.base_url", "http://127.0.0.1:5000")?
            .set_default("backend.timeout_secs", 30)?
            .set_default("roles.enabled", false)?
            .set_default("roles.default_role", "default")?
            .set_default("display.reply_format", "markup")?
            .set_default("display.clear_policy", "rebuild")?
            .set_default("display.input_max_height", 150)?
            .set_default("display.line_height", 24)?
            .set_default("submission.overlap", "allow")?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(Path::new(path))),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false)),
        };

        // E.g. CHAT_WIDGET_BACKEND__BASE_URL=http://localhost:8080
        builder = builder.add_source(
            Environment::with_prefix("CHAT_WIDGET")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(url) = cli.backend_url {
            builder = builder.set_override("backend.base_url", url)?;
        }
        if let Some(enabled) = cli.roles_enabled {
            builder = builder.set_override("roles.enabled", enabled)?;
        }
        if let Some(role) = cli.role {
            builder = builder.set_override("roles.initial", role)?;
        }
        if let Some(overlap) = cli.overlap {
            builder = builder.set_override("submission.overlap", overlap)?;
        }

        builder.build()?.try_deserialize()
    }

    /// The role that is active when the widget mounts.
    #[must_use]
    pub fn initial_role(&self) -> String {
        self.roles
            .initial
            .clone()
            .or_else(|| self.roles.available.first().cloned())
            .unwrap_or_else(|| self.roles.default_role.clone())
    }
}
