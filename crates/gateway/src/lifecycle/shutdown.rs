//! Shutdown sequencer.
//!
//! Teardown walks the set in reverse registration order and never
//! aborts: one subsystem's stop failure is logged and isolated so the
//! rest still get their teardown. Subsystems that never reached a live
//! state are skipped, which also makes a second full run a no-op.

use adj_domain::subsystem::{LifecycleState, ShutdownEntry, ShutdownOutcome, ShutdownReport};

use super::registry::SubsystemSet;

pub struct ShutdownSequencer;

impl ShutdownSequencer {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, set: &SubsystemSet) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        for subsystem in set.entries().iter().rev() {
            let name = subsystem.name();

            if !set.state(name).is_live() {
                report.subsystems.push(ShutdownEntry {
                    name,
                    outcome: ShutdownOutcome::Skipped,
                });
                continue;
            }

            set.set_state(name, LifecycleState::Stopping);
            tracing::info!(subsystem = %name, "stopping subsystem");

            let outcome = match subsystem.stop().await {
                Ok(()) => {
                    set.set_state(name, LifecycleState::Stopped);
                    ShutdownOutcome::Stopped
                }
                Err(e) => {
                    set.set_state(name, LifecycleState::Failed);
                    tracing::error!(
                        subsystem = %name,
                        error = %e,
                        "subsystem failed to stop cleanly"
                    );
                    ShutdownOutcome::Failed(e.to_string())
                }
            };
            report.subsystems.push(ShutdownEntry { name, outcome });
        }

        if report.failure_count() > 0 {
            tracing::warn!(
                failures = report.failure_count(),
                "shutdown finished with failures"
            );
        }
        report
    }
}

impl Default for ShutdownSequencer {
    fn default() -> Self {
        Self::new()
    }
}
