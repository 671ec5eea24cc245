use editorial_types::{EditorialError, EditorialResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest lease accepted from configuration
const MAX_LEASE_SECS: u64 = 24 * 60 * 60;

/// Lease timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockConfig {
    /// How long an acquired or renewed lock stays live
    #[serde(default = "default_lease_duration")]
    pub lease_duration_secs: u64,

    /// How often a heartbeat renews; must be shorter than the lease
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease_duration_secs: default_lease_duration(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl LockConfig {
    pub fn new(lease_duration_secs: u64, heartbeat_interval_secs: u64) -> EditorialResult<Self> {
        let config = Self {
            lease_duration_secs,
            heartbeat_interval_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EditorialResult<()> {
        if self.heartbeat_interval_secs == 0 {
            return Err(EditorialError::Validation(
                "heartbeat_interval_secs must be positive".to_string(),
            ));
        }
        if self.lease_duration_secs > MAX_LEASE_SECS {
            return Err(EditorialError::Validation(format!(
                "lease_duration_secs must not exceed {}",
                MAX_LEASE_SECS
            )));
        }
        if self.heartbeat_interval_secs >= self.lease_duration_secs {
            return Err(EditorialError::Validation(format!(
                "heartbeat interval ({}s) must be shorter than the lease ({}s)",
                self.heartbeat_interval_secs, self.lease_duration_secs
            )));
        }
        Ok(())
    }

    pub fn lease(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lease_duration_secs.min(MAX_LEASE_SECS) as i64)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

fn default_lease_duration() -> u64 {
    120
}

fn default_heartbeat_interval() -> u64 {
    60
}
