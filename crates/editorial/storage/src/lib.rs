//! Editorial storage abstractions.
//!
//! The store is the single home of the two pieces of shared mutable state
//! in the editorial system: an article's `status` and its live edit lock.
//! Every mutation is a conditional write evaluated against the current row:
//! - status transitions compare `(status, version)` and apply the ledger
//!   effects and an optional lock release in the same write
//! - content writes compare `version` and, under review, the writer's lease
//! - lock acquire/renew/release compare holder and expiry
//!
//! Nothing here reads-then-writes across two calls, so callers may be spread
//! over many processes sharing one PostgreSQL database.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{StorageError, StorageResult};
pub use model::{
    DecisionWrite, EditGuard, LockAcquisition, LockRenewal, QueryWindow, TransitionCommit,
    TransitionOutcome,
};
pub use traits::{ArticleStore, EditorialStore, LockStore, ReviewStore, WorkflowStore};
