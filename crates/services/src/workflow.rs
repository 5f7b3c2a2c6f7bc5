//! Workflow engine: named multi-step automations triggered on demand.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Map, Value};

use adj_domain::config::{Transport, WorkflowConfig, WorkflowDef};
use adj_domain::error::{Error, Result};
use adj_domain::subsystem::{Subsystem, SubsystemName};

use crate::rest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// State of one workflow execution.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    pub run_id: String,
    pub workflow_id: String,
    pub status: RunStatus,
    pub steps_completed: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn list(&self) -> Result<Vec<WorkflowDef>>;

    /// Start a run of the named workflow; returns the run id.
    async fn run(&self, workflow_id: &str, params: &Map<String, Value>) -> Result<String>;

    async fn get_run(&self, run_id: &str) -> Result<WorkflowRun>;

    async fn shutdown(&self) -> Result<()>;
}

pub fn create(
    cfg: &WorkflowConfig,
) -> Result<(Arc<dyn WorkflowEngine>, Arc<dyn Subsystem>)> {
    match cfg.transport {
        Transport::Local => {
            let engine = Arc::new(LocalWorkflowEngine::new(cfg.definitions.clone()));
            Ok((engine.clone(), engine))
        }
        Transport::Rest => {
            let engine = Arc::new(RestWorkflowClient::new(cfg)?);
            Ok((engine.clone(), engine))
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Executes configured workflow definitions in-process. Steps carry no
/// side effects here; each run walks its step list and records the
/// result, which is what the run API needs to behave end to end.
pub struct LocalWorkflowEngine {
    definitions: Vec<WorkflowDef>,
    runs: RwLock<HashMap<String, WorkflowRun>>,
}

impl LocalWorkflowEngine {
    pub fn new(definitions: Vec<WorkflowDef>) -> Self {
        Self {
            definitions,
            runs: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl WorkflowEngine for LocalWorkflowEngine {
    async fn list(&self) -> Result<Vec<WorkflowDef>> {
        Ok(self.definitions.clone())
    }

    async fn run(&self, workflow_id: &str, params: &Map<String, Value>) -> Result<String> {
        let def = self
            .definitions
            .iter()
            .find(|d| d.id == workflow_id)
            .ok_or_else(|| Error::NotFound(format!("workflow {workflow_id}")))?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        tracing::info!(
            workflow_id = %workflow_id,
            run_id = %run_id,
            params = params.len(),
            "workflow run started"
        );

        let run = WorkflowRun {
            run_id: run_id.clone(),
            workflow_id: workflow_id.to_owned(),
            status: RunStatus::Completed,
            steps_completed: def.steps.clone(),
            started_at,
            finished_at: Some(Utc::now()),
        };
        self.runs.write().insert(run_id.clone(), run);
        Ok(run_id)
    }

    async fn get_run(&self, run_id: &str) -> Result<WorkflowRun> {
        self.runs
            .read()
            .get(run_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("workflow run {run_id}")))
    }

    async fn shutdown(&self) -> Result<()> {
        let open = self
            .runs
            .read()
            .values()
            .filter(|r| r.status == RunStatus::Running)
            .count();
        if open > 0 {
            tracing::warn!(open, "shutting down with workflow runs still open");
        }
        Ok(())
    }
}

#[async_trait]
impl Subsystem for LocalWorkflowEngine {
    fn name(&self) -> SubsystemName {
        SubsystemName::Workflow
    }

    async fn start(&self) -> Result<()> {
        for def in &self.definitions {
            if def.steps.is_empty() {
                return Err(Error::Init(format!("workflow {} has no steps", def.id)));
            }
        }
        tracing::info!(definitions = self.definitions.len(), "workflow engine ready");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.shutdown().await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REST client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RestWorkflowClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestWorkflowClient {
    pub fn new(cfg: &WorkflowConfig) -> Result<Self> {
        Ok(Self {
            http: rest::client(cfg.timeout_ms)?,
            base_url: rest::base(&cfg.base_url),
        })
    }
}

fn run_from(v: &Value) -> Result<WorkflowRun> {
    let field = |name: &str| -> Result<&str> {
        v.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Http(format!("workflow run: missing {name}")))
    };

    let status = match field("status")? {
        "running" => RunStatus::Running,
        "completed" => RunStatus::Completed,
        "failed" => RunStatus::Failed,
        other => return Err(Error::Http(format!("workflow run: status {other}"))),
    };

    Ok(WorkflowRun {
        run_id: field("run_id")?.to_owned(),
        workflow_id: field("workflow_id")?.to_owned(),
        status,
        steps_completed: v
            .get("steps_completed")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default(),
        started_at: field("started_at")?
            .parse()
            .map_err(|e| Error::Http(format!("workflow run: started_at: {e}")))?,
        finished_at: v
            .get("finished_at")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()),
    })
}

#[async_trait]
impl WorkflowEngine for RestWorkflowClient {
    async fn list(&self) -> Result<Vec<WorkflowDef>> {
        let body = rest::expect_json(
            self.http.get(format!("{}/v1/workflows", self.base_url)),
            "workflow list",
        )
        .await?;

        let items = body
            .get("workflows")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Http("workflow list: missing workflows array".into()))?;

        items
            .iter()
            .map(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| Error::Http(format!("workflow list: {e}")))
            })
            .collect()
    }

    async fn run(&self, workflow_id: &str, params: &Map<String, Value>) -> Result<String> {
        let body = rest::expect_json(
            self.http
                .post(format!("{}/v1/workflows/{workflow_id}/runs", self.base_url))
                .json(&json!({ "params": params })),
            "workflow run",
        )
        .await?;

        body.get("run_id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::Http("workflow run: missing run_id".into()))
    }

    async fn get_run(&self, run_id: &str) -> Result<WorkflowRun> {
        let body = rest::expect_json(
            self.http.get(format!("{}/v1/runs/{run_id}", self.base_url)),
            "workflow get_run",
        )
        .await?;
        run_from(&body)
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Subsystem for RestWorkflowClient {
    fn name(&self) -> SubsystemName {
        SubsystemName::Workflow
    }

    async fn start(&self) -> Result<()> {
        rest::probe_health(&self.http, &self.base_url, "workflow engine").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> Vec<WorkflowDef> {
        vec![
            WorkflowDef {
                id: "daily-brief".into(),
                name: "Daily briefing".into(),
                steps: vec!["gather".into(), "summarize".into(), "deliver".into()],
            },
            WorkflowDef {
                id: "inbox-triage".into(),
                name: "Inbox triage".into(),
                steps: vec!["scan".into(), "label".into()],
            },
        ]
    }

    #[tokio::test]
    async fn runs_known_workflow_to_completion() {
        let engine = LocalWorkflowEngine::new(defs());
        let run_id = engine.run("daily-brief", &Map::new()).await.unwrap();

        let run = engine.get_run(&run_id).await.unwrap();
        assert_eq!(run.workflow_id, "daily-brief");
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.steps_completed, vec!["gather", "summarize", "deliver"]);
        assert!(run.finished_at.is_some());
    }

    #[tokio::test]
    async fn unknown_workflow_and_run_are_not_found() {
        let engine = LocalWorkflowEngine::new(defs());
        assert!(matches!(
            engine.run("nope", &Map::new()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            engine.get_run("nope").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn start_rejects_empty_step_list() {
        let engine = LocalWorkflowEngine::new(vec![WorkflowDef {
            id: "broken".into(),
            name: "Broken".into(),
            steps: vec![],
        }]);
        assert!(matches!(
            Subsystem::start(&engine).await,
            Err(Error::Init(_))
        ));
    }

    #[tokio::test]
    async fn list_returns_configured_definitions() {
        let engine = LocalWorkflowEngine::new(defs());
        let listed = engine.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].id, "inbox-triage");
    }
}
