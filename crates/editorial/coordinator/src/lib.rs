//! Workflow coordinator
//!
//! The one component outer surfaces talk to. It loads an article, asks the
//! state machine whether the caller may act, and commits the resulting plan
//! (status, ledger row, lock release) as a single conditional write. Edit
//! sessions go through the lock manager; content writes check the lease.
//!
//! Every accepted change is announced as a [`WorkflowEvent`] on a broadcast
//! channel. Slow or absent subscribers never hold up the workflow.

#![deny(unsafe_code)]

mod coordinator;
mod events;
mod requests;

pub use coordinator::WorkflowCoordinator;
pub use events::WorkflowEvent;
pub use requests::{ContentUpdate, EditGrant, NewArticle};
