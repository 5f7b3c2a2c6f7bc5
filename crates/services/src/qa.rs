//! QA engine: review requests over code, content, and releases.

use std::collections::HashMap;
use std::str::FromStr;
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

/// The review kinds the engine accepts. Anything else is rejected at
/// the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    Code,
    Content,
    Security,
    Regression,
}

impl FromStr for ReviewType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "code" => Ok(Self::Code),
            "content" => Ok(Self::Content),
            "security" => Ok(Self::Security),
            "regression" => Ok(Self::Regression),
            other => Err(Error::Invalid(format!(
                "unknown review type {other:?}; expected code, content, security or regression"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: String,
    pub review_type: ReviewType,
    pub target: String,
    pub status: ReviewStatus,
    pub findings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait QaEngine: Send + Sync {
    /// Open a review of `target`; returns the review id.
    async fn create_review(&self, review_type: ReviewType, target: &str) -> Result<String>;

    async fn get_review(&self, id: &str) -> Result<Review>;

    async fn shutdown(&self) -> Result<()>;
}

pub fn create(cfg: &ServiceEndpoint) -> Result<(Arc<dyn QaEngine>, Arc<dyn Subsystem>)> {
    match cfg.transport {
        Transport::Local => {
            let engine = Arc::new(LocalQaEngine::new());
            Ok((engine.clone(), engine))
        }
        Transport::Rest => {
            let engine = Arc::new(RestQaClient::new(cfg)?);
            Ok((engine.clone(), engine))
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-process engine: every review completes immediately with no
/// findings. The review bookkeeping, not the analysis, is what the
/// rest of the system depends on.
pub struct LocalQaEngine {
    reviews: RwLock<HashMap<String, Review>>,
}

impl LocalQaEngine {
    pub fn new() -> Self {
        Self {
            reviews: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for LocalQaEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QaEngine for LocalQaEngine {
    async fn create_review(&self, review_type: ReviewType, target: &str) -> Result<String> {
        if target.is_empty() {
            return Err(Error::Invalid("review target must not be empty".into()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.reviews.write().insert(
            id.clone(),
            Review {
                id: id.clone(),
                review_type,
                target: target.to_owned(),
                status: ReviewStatus::Completed,
                findings: Vec::new(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_review(&self, id: &str) -> Result<Review> {
        self.reviews
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("review {id}")))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Subsystem for LocalQaEngine {
    fn name(&self) -> SubsystemName {
        SubsystemName::Qa
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REST client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RestQaClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestQaClient {
    pub fn new(cfg: &ServiceEndpoint) -> Result<Self> {
        Ok(Self {
            http: rest::client(cfg.timeout_ms)?,
            base_url: rest::base(&cfg.base_url),
        })
    }
}

fn review_from(v: &Value) -> Result<Review> {
    let field = |name: &str| -> Result<&str> {
        v.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Http(format!("qa review: missing {name}")))
    };

    let status = match field("status")? {
        "pending" => ReviewStatus::Pending,
        "completed" => ReviewStatus::Completed,
        other => return Err(Error::Http(format!("qa review: status {other}"))),
    };

    Ok(Review {
        id: field("id")?.to_owned(),
        review_type: field("review_type")?.parse()?,
        target: field("target")?.to_owned(),
        status,
        findings: v
            .get("findings")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default(),
        created_at: field("created_at")?
            .parse()
            .map_err(|e| Error::Http(format!("qa review: created_at: {e}")))?,
    })
}

#[async_trait]
impl QaEngine for RestQaClient {
    async fn create_review(&self, review_type: ReviewType, target: &str) -> Result<String> {
        let body = rest::expect_json(
            self.http
                .post(format!("{}/v1/reviews", self.base_url))
                .json(&json!({ "review_type": review_type, "target": target })),
            "qa create_review",
        )
        .await?;

        body.get("id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::Http("qa create_review: missing id".into()))
    }

    async fn get_review(&self, id: &str) -> Result<Review> {
        let body = rest::expect_json(
            self.http.get(format!("{}/v1/reviews/{id}", self.base_url)),
            "qa get_review",
        )
        .await?;
        review_from(&body)
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Subsystem for RestQaClient {
    fn name(&self) -> SubsystemName {
        SubsystemName::Qa
    }

    async fn start(&self) -> Result<()> {
        rest::probe_health(&self.http, &self.base_url, "qa engine").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reviews_complete_and_are_retrievable() {
        let engine = LocalQaEngine::new();
        let id = engine
            .create_review(ReviewType::Code, "crates/gateway")
            .await
            .unwrap();

        let review = engine.get_review(&id).await.unwrap();
        assert_eq!(review.review_type, ReviewType::Code);
        assert_eq!(review.target, "crates/gateway");
        assert_eq!(review.status, ReviewStatus::Completed);
        assert!(review.findings.is_empty());
    }

    #[tokio::test]
    async fn empty_target_is_invalid() {
        let engine = LocalQaEngine::new();
        assert!(matches!(
            engine.create_review(ReviewType::Security, "").await,
            Err(Error::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn unknown_review_is_not_found() {
        let engine = LocalQaEngine::new();
        assert!(matches!(
            engine.get_review("missing").await,
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn review_type_parses_known_kinds_only() {
        assert_eq!("code".parse::<ReviewType>().unwrap(), ReviewType::Code);
        assert_eq!(
            "regression".parse::<ReviewType>().unwrap(),
            ReviewType::Regression
        );
        assert!(matches!(
            "vibes".parse::<ReviewType>(),
            Err(Error::Invalid(_))
        ));
    }
}
