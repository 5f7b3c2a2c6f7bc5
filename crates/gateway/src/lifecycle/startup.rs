//! Startup sequencer.
//!
//! Subsystems start strictly in registration order, one at a time. A
//! failed fatal subsystem aborts the sequence immediately: subsystems
//! after it are never started and keep their `Uninitialized` state. A
//! failed degraded-criticality subsystem is recorded and the sequence
//! continues, so the process can come up without, say, voice.

use adj_domain::error::{Error, Result};
use adj_domain::subsystem::{Criticality, LifecycleState, ReadinessReport};

use super::registry::SubsystemSet;

pub struct StartupSequencer;

impl StartupSequencer {
    pub fn new() -> Self {
        Self
    }

    /// Run the startup sequence over the set.
    ///
    /// Returns the readiness report on success (which may include
    /// degraded subsystems), or [`Error::Startup`] naming the fatal
    /// subsystem that aborted the sequence.
    pub async fn run(&self, set: &SubsystemSet) -> Result<ReadinessReport> {
        for subsystem in set.entries() {
            let name = subsystem.name();
            set.set_state(name, LifecycleState::Starting);
            tracing::info!(subsystem = %name, "starting subsystem");

            match subsystem.start().await {
                Ok(()) => {
                    set.set_state(name, LifecycleState::Ready);
                    tracing::info!(subsystem = %name, "subsystem ready");
                }
                Err(e) if subsystem.criticality() == Criticality::Degraded => {
                    set.set_state(name, LifecycleState::Degraded);
                    set.set_note(name, e.to_string());
                    tracing::warn!(
                        subsystem = %name,
                        error = %e,
                        "subsystem failed to start; continuing degraded"
                    );
                }
                Err(e) => {
                    set.set_state(name, LifecycleState::Failed);
                    tracing::error!(
                        subsystem = %name,
                        error = %e,
                        "fatal subsystem failed to start; aborting startup"
                    );
                    return Err(Error::Startup {
                        subsystem: name,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(ReadinessReport {
            subsystems: set.snapshot(),
        })
    }
}

impl Default for StartupSequencer {
    fn default() -> Self {
        Self::new()
    }
}
