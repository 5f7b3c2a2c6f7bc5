//! Startup/shutdown sequencing against scripted subsystems.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use adj_domain::error::{Error, Result};
use adj_domain::subsystem::{
    Criticality, LifecycleState, ShutdownOutcome, Subsystem, SubsystemName,
};
use adj_gateway::lifecycle::{ShutdownSequencer, StartupSequencer, SubsystemSet};

struct FakeSubsystem {
    name: SubsystemName,
    criticality: Criticality,
    fail_start: bool,
    fail_stop: bool,
    started: AtomicBool,
    stopped: AtomicBool,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeSubsystem {
    fn new(name: SubsystemName, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            criticality: Criticality::Fatal,
            fail_start: false,
            fail_stop: false,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            log,
        })
    }

    fn failing_start(name: SubsystemName, criticality: Criticality, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            criticality,
            fail_start: true,
            fail_stop: false,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            log,
        })
    }

    fn failing_stop(name: SubsystemName, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            criticality: Criticality::Fatal,
            fail_start: false,
            fail_stop: true,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            log,
        })
    }
}

#[async_trait]
impl Subsystem for FakeSubsystem {
    fn name(&self) -> SubsystemName {
        self.name
    }

    fn criticality(&self) -> Criticality {
        self.criticality
    }

    async fn start(&self) -> Result<()> {
        self.log.lock().push(format!("start:{}", self.name));
        if self.fail_start {
            return Err(Error::Init(format!("{} refused to start", self.name)));
        }
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.log.lock().push(format!("stop:{}", self.name));
        if self.fail_stop {
            return Err(Error::Shutdown(format!("{} refused to stop", self.name)));
        }
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

const ALL: [SubsystemName; 6] = [
    SubsystemName::Storage,
    SubsystemName::Assistant,
    SubsystemName::Memory,
    SubsystemName::Voice,
    SubsystemName::Workflow,
    SubsystemName::Qa,
];

#[tokio::test]
async fn startup_runs_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut set = SubsystemSet::new();
    for name in ALL {
        set.register(FakeSubsystem::new(name, log.clone()));
    }

    let report = StartupSequencer::new().run(&set).await.unwrap();
    assert!(report.is_ready());

    let expected: Vec<String> = ALL.iter().map(|n| format!("start:{n}")).collect();
    assert_eq!(*log.lock(), expected);
    for name in ALL {
        assert_eq!(set.state(name), LifecycleState::Ready);
    }
}

#[tokio::test]
async fn fatal_failure_aborts_and_leaves_the_rest_unstarted() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut set = SubsystemSet::new();

    let storage = FakeSubsystem::new(SubsystemName::Storage, log.clone());
    let assistant = FakeSubsystem::new(SubsystemName::Assistant, log.clone());
    let memory = FakeSubsystem::failing_start(
        SubsystemName::Memory,
        Criticality::Fatal,
        log.clone(),
    );
    let voice = FakeSubsystem::new(SubsystemName::Voice, log.clone());
    let workflow = FakeSubsystem::new(SubsystemName::Workflow, log.clone());

    set.register(storage.clone());
    set.register(assistant.clone());
    set.register(memory);
    set.register(voice.clone());
    set.register(workflow.clone());

    let err = StartupSequencer::new().run(&set).await.unwrap_err();
    match err {
        Error::Startup { subsystem, .. } => assert_eq!(subsystem, SubsystemName::Memory),
        other => panic!("unexpected error: {other}"),
    }

    // Everything after the failed subsystem was never touched.
    assert!(!voice.started.load(Ordering::SeqCst));
    assert!(!workflow.started.load(Ordering::SeqCst));
    assert_eq!(set.state(SubsystemName::Voice), LifecycleState::Uninitialized);
    assert_eq!(set.state(SubsystemName::Workflow), LifecycleState::Uninitialized);

    assert_eq!(set.state(SubsystemName::Storage), LifecycleState::Ready);
    assert_eq!(set.state(SubsystemName::Memory), LifecycleState::Failed);
}

#[tokio::test]
async fn degraded_subsystem_does_not_block_readiness() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut set = SubsystemSet::new();
    set.register(FakeSubsystem::new(SubsystemName::Storage, log.clone()));
    set.register(FakeSubsystem::failing_start(
        SubsystemName::Voice,
        Criticality::Degraded,
        log.clone(),
    ));
    let qa = FakeSubsystem::new(SubsystemName::Qa, log.clone());
    set.register(qa.clone());

    let report = StartupSequencer::new().run(&set).await.unwrap();
    assert!(report.is_ready());
    assert_eq!(set.state(SubsystemName::Voice), LifecycleState::Degraded);
    // The sequence continued past the degraded subsystem.
    assert!(qa.started.load(Ordering::SeqCst));

    let voice_report = report
        .subsystems
        .iter()
        .find(|s| s.name == SubsystemName::Voice)
        .unwrap();
    assert!(voice_report.note.as_deref().unwrap().contains("refused"));
}

#[tokio::test]
async fn shutdown_reverses_order_and_isolates_failures() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut set = SubsystemSet::new();

    let storage = FakeSubsystem::new(SubsystemName::Storage, log.clone());
    let memory = FakeSubsystem::failing_stop(SubsystemName::Memory, log.clone());
    let qa = FakeSubsystem::new(SubsystemName::Qa, log.clone());
    set.register(storage.clone());
    set.register(memory);
    set.register(qa.clone());

    StartupSequencer::new().run(&set).await.unwrap();
    log.lock().clear();

    let report = ShutdownSequencer::new().run(&set).await;
    assert_eq!(
        *log.lock(),
        vec!["stop:qa", "stop:memory", "stop:storage"]
    );

    // The middle failure did not keep storage from its teardown.
    assert_eq!(report.failure_count(), 1);
    assert!(matches!(
        report.outcome_of(SubsystemName::Memory),
        Some(ShutdownOutcome::Failed(_))
    ));
    assert!(storage.stopped.load(Ordering::SeqCst));
    assert!(qa.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn shutdown_skips_subsystems_that_never_started() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut set = SubsystemSet::new();
    set.register(FakeSubsystem::new(SubsystemName::Storage, log.clone()));
    set.register(FakeSubsystem::failing_start(
        SubsystemName::Assistant,
        Criticality::Fatal,
        log.clone(),
    ));
    let qa = FakeSubsystem::new(SubsystemName::Qa, log.clone());
    set.register(qa.clone());

    StartupSequencer::new().run(&set).await.unwrap_err();

    let report = ShutdownSequencer::new().run(&set).await;
    assert_eq!(
        report.outcome_of(SubsystemName::Qa),
        Some(&ShutdownOutcome::Skipped)
    );
    assert_eq!(
        report.outcome_of(SubsystemName::Assistant),
        Some(&ShutdownOutcome::Skipped)
    );
    assert_eq!(
        report.outcome_of(SubsystemName::Storage),
        Some(&ShutdownOutcome::Stopped)
    );
    assert!(!qa.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn second_shutdown_is_a_no_op() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut set = SubsystemSet::new();
    for name in ALL {
        set.register(FakeSubsystem::new(name, log.clone()));
    }
    StartupSequencer::new().run(&set).await.unwrap();

    let first = ShutdownSequencer::new().run(&set).await;
    assert!(first
        .subsystems
        .iter()
        .all(|e| e.outcome == ShutdownOutcome::Stopped));

    let second = ShutdownSequencer::new().run(&set).await;
    assert!(second
        .subsystems
        .iter()
        .all(|e| e.outcome == ShutdownOutcome::Skipped));
}
