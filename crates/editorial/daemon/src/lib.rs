//! Editorial daemon library
//!
//! REST surface over the workflow coordinator:
//! - article CRUD and content edits
//! - workflow transitions and the reviewer ledger
//! - edit lock sessions (acquire / heartbeat renew / release)
//!
//! Identity comes from the gateway as `x-caller-id` and `x-caller-groups`
//! headers; roles are derived server-side from the groups.

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use server::Server;
