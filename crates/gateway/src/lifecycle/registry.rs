//! The ordered subsystem set and the typed registry built on top of it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use adj_domain::config::ServicesConfig;
use adj_domain::error::Result;
use adj_domain::subsystem::{LifecycleState, Subsystem, SubsystemName, SubsystemReport};
use adj_services::{
    assistant, datastore, memory, qa, voice, workflow, AssistantEngine, Datastore,
    MemoryService, QaEngine, VoiceInterface, WorkflowEngine,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Subsystem set
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The process's subsystems in registration order, plus each one's
/// current lifecycle state.
///
/// Registration order is startup order; shutdown walks it in reverse.
/// State transitions are driven only by the sequencers; everything
/// else reads.
pub struct SubsystemSet {
    entries: Vec<Arc<dyn Subsystem>>,
    states: RwLock<HashMap<SubsystemName, LifecycleState>>,
    notes: RwLock<HashMap<SubsystemName, String>>,
}

impl SubsystemSet {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            states: RwLock::new(HashMap::new()),
            notes: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&mut self, subsystem: Arc<dyn Subsystem>) {
        self.states
            .write()
            .insert(subsystem.name(), LifecycleState::Uninitialized);
        self.entries.push(subsystem);
    }

    pub fn state(&self, name: SubsystemName) -> LifecycleState {
        self.states
            .read()
            .get(&name)
            .copied()
            .unwrap_or(LifecycleState::Uninitialized)
    }

    pub(crate) fn set_state(&self, name: SubsystemName, state: LifecycleState) {
        self.states.write().insert(name, state);
    }

    pub(crate) fn set_note(&self, name: SubsystemName, note: String) {
        self.notes.write().insert(name, note);
    }

    pub(crate) fn entries(&self) -> &[Arc<dyn Subsystem>] {
        &self.entries
    }

    /// Per-subsystem state snapshot, in registration order.
    pub fn snapshot(&self) -> Vec<SubsystemReport> {
        let notes = self.notes.read();
        self.entries
            .iter()
            .map(|s| SubsystemReport {
                name: s.name(),
                criticality: s.criticality(),
                state: self.state(s.name()),
                note: notes.get(&s.name()).cloned(),
            })
            .collect()
    }
}

impl Default for SubsystemSet {
    fn default() -> Self {
        Self::new()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Service registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Owns every collaborator as two facets: the capability trait object
/// the request path calls, and the [`Subsystem`] facet in the ordered
/// set the sequencers drive.
pub struct ServiceRegistry {
    set: SubsystemSet,
    datastore: Arc<dyn Datastore>,
    assistant: Arc<dyn AssistantEngine>,
    memory: Arc<dyn MemoryService>,
    voice: Arc<dyn VoiceInterface>,
    workflow: Arc<dyn WorkflowEngine>,
    qa: Arc<dyn QaEngine>,
}

impl ServiceRegistry {
    /// Construct every collaborator from config and register the
    /// lifecycle facets in the fixed startup order: storage first (the
    /// assistant persists through it), then assistant, memory, voice,
    /// workflow, qa. Construction performs no I/O.
    pub fn from_config(services: &ServicesConfig) -> Result<Self> {
        let (datastore, storage_sub) = datastore::create(&services.storage)?;
        let (assistant, assistant_sub) = assistant::create(&services.assistant)?;
        let (memory, memory_sub) = memory::create(&services.memory)?;
        let (voice, voice_sub) = voice::create(&services.voice)?;
        let (workflow, workflow_sub) = workflow::create(&services.workflow)?;
        let (qa, qa_sub) = qa::create(&services.qa)?;

        let mut set = SubsystemSet::new();
        set.register(storage_sub);
        set.register(assistant_sub);
        set.register(memory_sub);
        set.register(voice_sub);
        set.register(workflow_sub);
        set.register(qa_sub);

        Ok(Self {
            set,
            datastore,
            assistant,
            memory,
            voice,
            workflow,
            qa,
        })
    }

    pub fn subsystems(&self) -> &SubsystemSet {
        &self.set
    }

    pub fn state_of(&self, name: SubsystemName) -> LifecycleState {
        self.set.state(name)
    }

    pub fn datastore(&self) -> Arc<dyn Datastore> {
        self.datastore.clone()
    }

    pub fn assistant(&self) -> Arc<dyn AssistantEngine> {
        self.assistant.clone()
    }

    pub fn memory(&self) -> Arc<dyn MemoryService> {
        self.memory.clone()
    }

    pub fn voice(&self) -> Arc<dyn VoiceInterface> {
        self.voice.clone()
    }

    pub fn workflow(&self) -> Arc<dyn WorkflowEngine> {
        self.workflow.clone()
    }

    pub fn qa(&self) -> Arc<dyn QaEngine> {
        self.qa.clone()
    }
}
