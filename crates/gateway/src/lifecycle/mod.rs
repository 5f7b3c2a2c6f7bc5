//! Lifecycle core: the ordered subsystem set, the startup sequencer
//! that brings it up with criticality-aware failure handling, and the
//! shutdown sequencer that tears it down in reverse.

mod registry;
mod shutdown;
mod startup;

pub use registry::{ServiceRegistry, SubsystemSet};
pub use shutdown::ShutdownSequencer;
pub use startup::StartupSequencer;
