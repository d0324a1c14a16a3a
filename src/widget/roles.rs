//! Role selection.
//!
//! Exactly one role is active at a time. The server owns the session's role;
//! the widget only mirrors it after `/set_role` succeeds.

use tracing::{error, info, warn};

use super::ChatWidget;
use crate::backend::SetRoleRequest;
use crate::conversation::{Author, Body, Message};
use crate::surface::RoleOption;

/// How a role change ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOutcome {
    Changed,
    /// Role selection is turned off in the config.
    Disabled,
    /// Not one of the configured roles; nothing was sent.
    Unknown,
    /// The backend refused or was unreachable. Nothing visible changed.
    Failed,
}

/// Mutually exclusive role choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RoleSelector {
    available: Vec<String>,
    active: String,
}

impl RoleSelector {
    pub(crate) fn new(available: Vec<String>, active: String) -> Self {
        Self { available, active }
    }

    pub(crate) fn active(&self) -> &str {
        &self.active
    }

    /// An empty list accepts any label.
    pub(crate) fn accepts(&self, role: &str) -> bool {
        self.available.is_empty() || self.available.iter().any(|r| r == role)
    }

    pub(crate) fn select(&mut self, role: &str) {
        self.active = role.to_string();
    }

    pub(crate) fn options(&self) -> Vec<RoleOption> {
        self.available
            .iter()
            .map(|name| RoleOption {
                name: name.clone(),
                active: *name == self.active,
            })
            .collect()
    }
}

impl ChatWidget {
    /// Ask the backend to switch roles; mirror it on success.
    pub async fn select_role(&self, role: &str) -> RoleOutcome {
        if !self.inner.config.roles.enabled {
            return RoleOutcome::Disabled;
        }
        if !self.roles().accepts(role) {
            warn!(name: "role.unknown", role = %role, "Ignoring unknown role");
            return RoleOutcome::Unknown;
        }

        let request = SetRoleRequest {
            role: role.to_string(),
        };
        match self.inner.backend.set_role(&request).await {
            Ok(reply) if reply.success => {}
            Ok(_) => {
                warn!(name: "role.rejected", role = %role, "Backend refused role change");
                return RoleOutcome::Failed;
            }
            Err(err) => {
                error!(name: "role.transport_error", role = %role, error = %err, "Error changing role");
                return RoleOutcome::Failed;
            }
        }

        self.roles().select(role);
        self.show_roles();
        self.append(Message::new(
            Author::System,
            Body::text(format!("Role changed to {role}.")),
        ));

        info!(name: "role.changed", role = %role, "Role changed");
        RoleOutcome::Changed
    }

    /// The role currently mirrored from the server.
    #[must_use]
    pub fn active_role(&self) -> String {
        self.roles().active().to_string()
    }

    pub(super) fn show_roles(&self) {
        let (active, options) = {
            let roles = self.roles();
            (roles.active().to_string(), roles.options())
        };
        self.inner.surface.show_roles(&active, &options);
    }
}
