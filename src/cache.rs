//! Credential cache
//!
//! Holds the one session record worth keeping between runs so a restart does
//! not cost a full login plus account discovery. The host supplies the store;
//! an in-memory and a JSON-file implementation are provided.

use crate::error::{AlliantError, Result};
use crate::logging::get_logger;
use crate::session::SessionState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Store key shared by all installations
pub const STORAGE_KEY: &str = "alliant_energy_auth_store";

/// Bumped whenever the persisted record changes shape
pub const STORAGE_VERSION: u32 = 1;

/// Load/save access to the cached session record
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<SessionState>>;
    async fn save(&self, state: &SessionState) -> Result<()>;
}

/// Process-local store, mostly for tests and one-shot runs
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<SessionState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }

    /// Currently stored record
    pub async fn current(&self) -> Option<SessionState> {
        self.state.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<Option<SessionState>> {
        Ok(self.state.lock().await.clone())
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        *self.state.lock().await = Some(state.clone());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreEnvelope {
    version: u32,
    key: String,
    data: serde_json::Value,
}

/// JSON file store, one file per installation
pub struct FileStore {
    path: PathBuf,
    logger: crate::logging::StructuredLogger,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            logger: get_logger("cache"),
        }
    }

    /// `<dir>/alliant_energy_auth_store.<installation>.json`
    pub fn for_installation<P: AsRef<Path>>(directory: P, installation_id: &str) -> Self {
        let file_name = format!("{}.{}.json", STORAGE_KEY, installation_id);
        Self::new(directory.as_ref().join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileStore {
    async fn load(&self) -> Result<Option<SessionState>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            self.logger.debug("No cached session found");
            return Ok(None);
        }

        let contents = tokio::fs::read_to_string(&self.path).await?;
        let envelope: StoreEnvelope = serde_json::from_str(&contents)?;
        if envelope.version != STORAGE_VERSION || envelope.key != STORAGE_KEY {
            self.logger.warn(&format!(
                "Ignoring cached session with version {} key {}",
                envelope.version, envelope.key
            ));
            return Ok(None);
        }

        let state: SessionState = serde_json::from_value(envelope.data)?;
        Ok(Some(state))
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        let envelope = StoreEnvelope {
            version: STORAGE_VERSION,
            key: STORAGE_KEY.to_string(),
            data: serde_json::to_value(state)?,
        };
        let contents = serde_json::to_string_pretty(&envelope)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so a crash never leaves a truncated record
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            AlliantError::cache(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;
        self.logger.debug("Saved authentication data to cache");
        Ok(())
    }
}
