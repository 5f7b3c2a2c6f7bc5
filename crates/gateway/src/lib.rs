//! `adj-gateway` — the Adjutant backend process.
//!
//! Owns the subsystem lifecycle (ordered startup with criticality-
//! aware failure handling, reverse-order shutdown), the session
//! manager, the per-connection dispatch loop, and the HTTP/WebSocket
//! surface.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod dispatch;
pub mod lifecycle;
pub mod server;
pub mod state;
