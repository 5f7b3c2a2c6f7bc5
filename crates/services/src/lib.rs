//! `adj-services` — external collaborator clients for Adjutant.
//!
//! Each backend capability (storage tier, assistant engine, memory
//! store, voice interface, workflow engine, QA engine) is a narrow
//! trait plus two implementations selected by the per-service
//! `transport` config field:
//!
//! | Transport | Implementation                     | Best for             |
//! |-----------|------------------------------------|----------------------|
//! | `local`   | In-process, `parking_lot` state    | Dev, tests (default) |
//! | `rest`    | reqwest client against `base_url`  | Production           |
//!
//! Constructors never perform I/O; every fallible init step (directory
//! setup, upstream health probes) runs in the `Subsystem::start`
//! implementation so the startup sequencer can classify failures.
//!
//! Each module exposes a `create(cfg)` factory returning the service
//! as two facets of the same instance: the capability trait object the
//! request path calls, and the [`adj_domain::subsystem::Subsystem`]
//! facet the lifecycle sequencers drive.

pub mod assistant;
pub mod datastore;
pub mod memory;
pub mod qa;
mod rest;
pub mod voice;
pub mod workflow;

pub use assistant::{AssistantEngine, LocalAssistant, RestAssistantClient};
pub use datastore::{Datastore, FileEntry, LocalDatastore};
pub use memory::{LocalMemory, MemoryEntry, MemoryService, RestMemoryClient};
pub use qa::{LocalQaEngine, QaEngine, RestQaClient, Review, ReviewStatus, ReviewType};
pub use voice::{LocalVoice, RestVoiceClient, VoiceInterface};
pub use workflow::{
    LocalWorkflowEngine, RestWorkflowClient, RunStatus, WorkflowEngine, WorkflowRun,
};
