//! `adj-domain` — shared types for the Adjutant backend.
//!
//! Holds the pieces every other crate depends on: the TOML
//! configuration tree, the shared [`error::Error`] type, and the
//! subsystem model (names, criticality, lifecycle states, the
//! [`subsystem::Subsystem`] trait, and the readiness/shutdown reports
//! produced by the lifecycle sequencers).

pub mod config;
pub mod error;
pub mod subsystem;
