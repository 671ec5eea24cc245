//! Edit lock manager
//!
//! Serializes edits to an article while it is under review. A lock is a
//! lease: it is live while `now < expires_at` and simply stops counting once
//! that passes. Nothing sweeps expired rows; every reader re-checks liveness
//! against the injected [`Clock`].
//!
//! Editors keep their lease alive with a [`LeaseHeartbeat`], which renews
//! on a fixed interval and releases the lock when the editing session ends.

#![deny(unsafe_code)]

mod clock;
mod config;
mod heartbeat;
mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LockConfig;
pub use heartbeat::{HeartbeatState, LeaseHeartbeat, LeaseRenewer};
pub use manager::{EditLockManager, LockGrant};
