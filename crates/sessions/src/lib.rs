//! `adj-sessions` — session bookkeeping and principal resolution.
//!
//! [`SessionManager`] owns the per-connection session records: one
//! record per live duplex connection, created on accept, closed on
//! disconnect, reclaimed by a background sweep when a loop exits
//! abnormally. [`IdentityResolver`] maps connection credentials to an
//! authenticated principal before any session exists.

pub mod identity;
pub mod manager;

pub use identity::IdentityResolver;
pub use manager::{SessionManager, SessionRecord, SessionState};
