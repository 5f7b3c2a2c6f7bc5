//! Voice interface.
//!
//! Voice is the one collaborator the server can live without: its
//! [`Criticality::Degraded`] marking means a failed init leaves the
//! subsystem in the degraded state instead of aborting startup, and
//! `/api/status` reports it offline.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use adj_domain::config::{ServiceEndpoint, Transport};
use adj_domain::error::{Error, Result};
use adj_domain::subsystem::{Criticality, Subsystem, SubsystemName};

use crate::rest;

#[async_trait]
pub trait VoiceInterface: Send + Sync {
    /// Transcribe captured audio to text.
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;

    /// Synthesize speech for a reply.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    async fn shutdown(&self) -> Result<()>;
}

pub fn create(
    cfg: &ServiceEndpoint,
) -> Result<(Arc<dyn VoiceInterface>, Arc<dyn Subsystem>)> {
    match cfg.transport {
        Transport::Local => {
            let voice = Arc::new(LocalVoice::new());
            Ok((voice.clone(), voice))
        }
        Transport::Rest => {
            let voice = Arc::new(RestVoiceClient::new(cfg)?);
            Ok((voice.clone(), voice))
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local stub
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Dev stub: treats audio payloads as UTF-8 text and "synthesizes"
/// speech as the raw text bytes. Enough to exercise the voice paths
/// without an audio backend.
pub struct LocalVoice;

impl LocalVoice {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalVoice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceInterface for LocalVoice {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        String::from_utf8(audio.to_vec())
            .map_err(|_| Error::Invalid("audio payload is not UTF-8 text".into()))
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Subsystem for LocalVoice {
    fn name(&self) -> SubsystemName {
        SubsystemName::Voice
    }

    fn criticality(&self) -> Criticality {
        Criticality::Degraded
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REST client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RestVoiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestVoiceClient {
    pub fn new(cfg: &ServiceEndpoint) -> Result<Self> {
        Ok(Self {
            http: rest::client(cfg.timeout_ms)?,
            base_url: rest::base(&cfg.base_url),
        })
    }
}

#[async_trait]
impl VoiceInterface for RestVoiceClient {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let resp = self
            .http
            .post(format!("{}/v1/transcribe", self.base_url))
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| Error::Http(format!("voice transcribe: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Http(format!(
                "voice transcribe: {}",
                resp.status()
            )));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| Error::Http(format!("voice transcribe: decoding body: {e}")))?;
        body.get("text")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::Http("voice transcribe: missing text".into()))
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .post(format!("{}/v1/synthesize", self.base_url))
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| Error::Http(format!("voice synthesize: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Http(format!(
                "voice synthesize: {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("voice synthesize: reading body: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Subsystem for RestVoiceClient {
    fn name(&self) -> SubsystemName {
        SubsystemName::Voice
    }

    fn criticality(&self) -> Criticality {
        Criticality::Degraded
    }

    async fn start(&self) -> Result<()> {
        rest::probe_health(&self.http, &self.base_url, "voice interface").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_voice_round_trips_text() {
        let voice = LocalVoice::new();
        let audio = voice.synthesize("read me the agenda").await.unwrap();
        let text = voice.transcribe(&audio).await.unwrap();
        assert_eq!(text, "read me the agenda");
    }

    #[tokio::test]
    async fn non_utf8_audio_is_rejected() {
        let voice = LocalVoice::new();
        let err = voice.transcribe(&[0xff, 0xfe, 0x00]).await.unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[test]
    fn voice_failure_is_never_fatal() {
        assert_eq!(
            Subsystem::criticality(&LocalVoice::new()),
            Criticality::Degraded
        );
    }
}
