//! Editorial Workflow - the article approval state machine
//!
//! ```text
//! DRAFT -> PENDING -> APPROVED_BY_UNIT_EDITOR -> APPROVED_BY_UNIT_LEADER
//!       -> APPROVED_BY_UNIT_ADMIN -> APPROVED_BY_SCHOOL_ADMIN -> PUBLISHED
//! ```
//!
//! Every status under review (`PENDING` up to `APPROVED_BY_SCHOOL_ADMIN`)
//! can also send the article to `REJECTED`, from where authors reopen it as
//! a `DRAFT` and resubmit into a new review cycle. `PUBLISHED` goes back to
//! `APPROVED_BY_SCHOOL_ADMIN` only through an explicit unpublish.
//!
//! The state machine is pure: it reads a status, an action and a caller and
//! returns a [`TransitionPlan`] describing every effect the coordinator must
//! commit atomically. It never touches storage.

#![deny(unsafe_code)]

mod stages;
mod state_machine;

pub use stages::*;
pub use state_machine::*;
