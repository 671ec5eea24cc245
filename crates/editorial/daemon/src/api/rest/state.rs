//! Application state for API handlers

use editorial_coordinator::WorkflowCoordinator;
use editorial_roles::RoleResolver;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Workflow, ledger and lock facade
    pub coordinator: Arc<WorkflowCoordinator>,

    /// Group to role mapping applied to every caller
    pub resolver: Arc<RoleResolver>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(coordinator: Arc<WorkflowCoordinator>, resolver: Arc<RoleResolver>) -> Self {
        Self {
            coordinator,
            resolver,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        }
    }
}
