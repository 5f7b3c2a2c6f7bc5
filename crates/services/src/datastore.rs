//! Storage tier: state directory plus the sandboxed workspace the
//! files API reads from.
//!
//! Storage always runs in-process, so there is no REST variant here.
//! Every path coming in over the API is relative; anything that could
//! escape the workspace root is rejected before touching the disk.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use adj_domain::config::StorageConfig;
use adj_domain::error::{Error, Result};
use adj_domain::subsystem::{Subsystem, SubsystemName};

/// One entry from a workspace directory listing.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
}

#[async_trait]
pub trait Datastore: Send + Sync {
    /// List a workspace directory, relative to the workspace root.
    async fn list_dir(&self, rel: &str) -> Result<Vec<FileEntry>>;

    /// Read a workspace file as UTF-8 text.
    async fn read_file(&self, rel: &str) -> Result<String>;
}

pub fn create(cfg: &StorageConfig) -> Result<(Arc<dyn Datastore>, Arc<dyn Subsystem>)> {
    let store = Arc::new(LocalDatastore::new(cfg));
    Ok((store.clone(), store))
}

pub struct LocalDatastore {
    state_path: PathBuf,
    workspace_path: PathBuf,
}

impl LocalDatastore {
    pub fn new(cfg: &StorageConfig) -> Self {
        Self {
            state_path: cfg.state_path.clone(),
            workspace_path: cfg.workspace_path.clone(),
        }
    }

    /// Resolve a client-supplied relative path inside the workspace.
    /// Absolute paths and any `..` component are rejected outright;
    /// normalization tricks must not reach the filesystem.
    fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let rel_path = Path::new(rel);
        if rel_path.is_absolute() {
            return Err(Error::Invalid(format!("absolute path not allowed: {rel}")));
        }
        for component in rel_path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(Error::Invalid(format!(
                        "path escapes the workspace: {rel}"
                    )))
                }
            }
        }
        Ok(self.workspace_path.join(rel_path))
    }
}

#[async_trait]
impl Datastore for LocalDatastore {
    async fn list_dir(&self, rel: &str) -> Result<Vec<FileEntry>> {
        let dir = self.resolve(rel)?;
        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|_| Error::NotFound(format!("directory {rel}")))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let meta = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = if rel.is_empty() {
                name.clone()
            } else {
                format!("{}/{name}", rel.trim_end_matches('/'))
            };
            entries.push(FileEntry {
                name,
                path,
                is_dir: meta.is_dir(),
                size: meta.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read_file(&self, rel: &str) -> Result<String> {
        let path = self.resolve(rel)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::NotFound(format!("file {rel}")),
                _ => Error::Io(e),
            })
    }
}

#[async_trait]
impl Subsystem for LocalDatastore {
    fn name(&self) -> SubsystemName {
        SubsystemName::Storage
    }

    async fn start(&self) -> Result<()> {
        for (what, path) in [("state", &self.state_path), ("workspace", &self.workspace_path)] {
            tokio::fs::create_dir_all(path).await.map_err(|e| {
                Error::Init(format!("{what} directory {}: {e}", path.display()))
            })?;
        }
        tracing::info!(
            state = %self.state_path.display(),
            workspace = %self.workspace_path.display(),
            "storage directories ready"
        );
        Ok(())
    }
}
