//! API request handlers

mod articles;
mod health;
mod locks;
mod reviews;
mod transitions;

pub use articles::*;
pub use health::*;
pub use locks::*;
pub use reviews::*;
pub use transitions::*;
