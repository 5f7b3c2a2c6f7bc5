//! Long-term memory store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};

use adj_domain::config::{ServiceEndpoint, Transport};
use adj_domain::error::{Error, Result};
use adj_domain::subsystem::{Subsystem, SubsystemName};

use crate::rest;

#[derive(Debug, Clone, Serialize)]
pub struct MemoryEntry {
    pub id: String,
    pub principal_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Persist a memory for a principal; returns the entry id.
    async fn remember(&self, principal_id: &str, content: &str) -> Result<String>;

    /// Retrieve up to `limit` memories matching a query, most recent
    /// first.
    async fn recall(&self, principal_id: &str, query: &str, limit: usize)
        -> Result<Vec<MemoryEntry>>;

    async fn shutdown(&self) -> Result<()>;
}

pub fn create(
    cfg: &ServiceEndpoint,
) -> Result<(Arc<dyn MemoryService>, Arc<dyn Subsystem>)> {
    match cfg.transport {
        Transport::Local => {
            let mem = Arc::new(LocalMemory::new());
            Ok((mem.clone(), mem))
        }
        Transport::Rest => {
            let mem = Arc::new(RestMemoryClient::new(cfg)?);
            Ok((mem.clone(), mem))
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-process store with case-insensitive substring recall. Contents
/// live only as long as the process.
pub struct LocalMemory {
    entries: RwLock<Vec<MemoryEntry>>,
}

impl LocalMemory {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for LocalMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryService for LocalMemory {
    async fn remember(&self, principal_id: &str, content: &str) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.entries.write().push(MemoryEntry {
            id: id.clone(),
            principal_id: principal_id.to_owned(),
            content: content.to_owned(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn recall(
        &self,
        principal_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>> {
        let needle = query.to_lowercase();
        let mut hits: Vec<MemoryEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.principal_id == principal_id)
            .filter(|e| needle.is_empty() || e.content.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Subsystem for LocalMemory {
    fn name(&self) -> SubsystemName {
        SubsystemName::Memory
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.shutdown().await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REST client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RestMemoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestMemoryClient {
    pub fn new(cfg: &ServiceEndpoint) -> Result<Self> {
        Ok(Self {
            http: rest::client(cfg.timeout_ms)?,
            base_url: rest::base(&cfg.base_url),
        })
    }

    fn entry_from(&self, v: &Value) -> Option<MemoryEntry> {
        Some(MemoryEntry {
            id: v.get("id")?.as_str()?.to_owned(),
            principal_id: v.get("principal_id")?.as_str()?.to_owned(),
            content: v.get("content")?.as_str()?.to_owned(),
            created_at: v
                .get("created_at")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(Utc::now),
        })
    }
}

#[async_trait]
impl MemoryService for RestMemoryClient {
    async fn remember(&self, principal_id: &str, content: &str) -> Result<String> {
        let body = rest::expect_json(
            self.http
                .post(format!("{}/v1/memories", self.base_url))
                .json(&json!({ "principal_id": principal_id, "content": content })),
            "memory remember",
        )
        .await?;

        body.get("id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::Http("memory remember: missing id".into()))
    }

    async fn recall(
        &self,
        principal_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>> {
        let body = rest::expect_json(
            self.http
                .get(format!("{}/v1/memories", self.base_url))
                .query(&[
                    ("principal_id", principal_id),
                    ("q", query),
                    ("limit", &limit.to_string()),
                ]),
            "memory recall",
        )
        .await?;

        let items = body
            .get("memories")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Http("memory recall: missing memories array".into()))?;

        Ok(items.iter().filter_map(|v| self.entry_from(v)).collect())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Subsystem for RestMemoryClient {
    fn name(&self) -> SubsystemName {
        SubsystemName::Memory
    }

    async fn start(&self) -> Result<()> {
        rest::probe_health(&self.http, &self.base_url, "memory store").await
    }
}
