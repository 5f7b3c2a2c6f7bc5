//! Shared plumbing for the REST collaborator clients.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use adj_domain::error::{Error, Result};

/// Build a pooled HTTP client with the configured request timeout.
pub(crate) fn client(timeout_ms: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| Error::Http(e.to_string()))
}

pub(crate) fn base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_owned()
}

/// Probe `GET {base}/health`. Used by `Subsystem::start` for every
/// REST collaborator: an unreachable or unhealthy upstream fails the
/// subsystem's init, and the sequencer classifies it by criticality.
pub(crate) async fn probe_health(client: &Client, base_url: &str, what: &str) -> Result<()> {
    let url = format!("{base_url}/health");
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::Init(format!("{what}: {e}")))?;

    if !resp.status().is_success() {
        return Err(Error::Init(format!(
            "{what}: health probe returned {}",
            resp.status()
        )));
    }
    Ok(())
}

/// Send a request and decode the JSON body, mapping transport and
/// status failures onto the shared error type.
pub(crate) async fn expect_json(rb: reqwest::RequestBuilder, what: &str) -> Result<Value> {
    let resp = rb
        .send()
        .await
        .map_err(|e| Error::Http(format!("{what}: {e}")))?;

    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::NotFound(what.to_owned()));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Http(format!("{what}: {status}: {body}")));
    }

    resp.json::<Value>()
        .await
        .map_err(|e| Error::Http(format!("{what}: decoding body: {e}")))
}
