//! Editorial domain types
//!
//! The editorial backend gates how university articles move from a draft
//! to a published page. This crate holds the vocabulary every other
//! editorial crate speaks:
//!
//! - **Article**: content plus its workflow `status`, owner and contributors.
//! - **Role / RoleSet / Caller**: the ranked role hierarchy and the identity
//!   a request runs as. Only the highest rank matters for authorization.
//! - **ReviewerEntry**: one row of the reviewer ledger, scoped to a review
//!   cycle and a review level.
//! - **EditLock**: the time-bounded exclusive edit lease on an article.
//! - **EditorialError**: the error taxonomy surfaced to callers.
//!
//! The types carry no policy. Which transitions exist and who may trigger
//! them lives in `editorial-workflow`.

#![deny(unsafe_code)]

mod action;
mod article;
mod error;
mod ids;
mod lock;
mod review;
mod role;
mod status;

pub use action::*;
pub use article::*;
pub use error::*;
pub use ids::*;
pub use lock::*;
pub use review::*;
pub use role::*;
pub use status::*;
