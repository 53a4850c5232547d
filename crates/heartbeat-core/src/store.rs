//! Persistence of per-wallet hotspot status between runs.

use crate::error::StoreError;
use crate::types::WalletState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

const STATE_FILE: &str = "state.json";

/// Directory holding everything persisted for one wallet.
pub fn wallet_dir(data_dir: &Path, wallet: &str) -> PathBuf {
    let safe: String = wallet
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    data_dir.join(safe)
}

/// Latest hotspot status, keyed by wallet.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state for `wallet`, or an empty state if none was saved yet.
    async fn load(&self, wallet: &str) -> Result<WalletState, StoreError>;

    /// Replace the stored state for `wallet`.
    async fn save(&self, wallet: &str, state: &WalletState) -> Result<(), StoreError>;
}

/// JSON file per wallet, replaced atomically on every save.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn state_path(&self, wallet: &str) -> PathBuf {
        wallet_dir(&self.data_dir, wallet).join(STATE_FILE)
    }

    /// Write the serialized state next to the live file and fsync it.
    async fn stage(&self, wallet: &str, state: &WalletState) -> Result<PathBuf, StoreError> {
        let path = self.state_path(wallet);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json.as_bytes()).await?;

        let file = fs::File::open(&temp_path).await?;
        file.sync_all().await?;

        Ok(temp_path)
    }

    /// Move a staged file over the live one.
    async fn commit(&self, wallet: &str, temp_path: &Path) -> Result<(), StoreError> {
        let path = self.state_path(wallet);
        fs::rename(temp_path, &path).await?;
        debug!("State persisted to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self, wallet: &str) -> Result<WalletState, StoreError> {
        let path = self.state_path(wallet);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(wallet = %wallet, "No previous state found, starting fresh");
                return Ok(WalletState::new(wallet));
            }
            Err(e) => return Err(e.into()),
        };

        let state: WalletState = serde_json::from_str(&content)?;
        debug!(
            wallet = %wallet,
            hotspots = state.hotspots.len(),
            run_count = state.run_count,
            "Loaded previous state from {}",
            path.display()
        );
        Ok(state)
    }

    async fn save(&self, wallet: &str, state: &WalletState) -> Result<(), StoreError> {
        let temp_path = self.stage(wallet, state).await?;
        self.commit(wallet, &temp_path).await
    }
}

/// In-memory store, mainly for tests.
#[derive(Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<String, WalletState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_state(state: WalletState) -> Self {
        let store = Self::new();
        store
            .states
            .lock()
            .await
            .insert(state.wallet.clone(), state);
        store
    }

    pub async fn snapshot(&self, wallet: &str) -> Option<WalletState> {
        self.states.lock().await.get(wallet).cloned()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, wallet: &str) -> Result<WalletState, StoreError> {
        Ok(self
            .states
            .lock()
            .await
            .get(wallet)
            .cloned()
            .unwrap_or_else(|| WalletState::new(wallet)))
    }

    async fn save(&self, wallet: &str, state: &WalletState) -> Result<(), StoreError> {
        self.states
            .lock()
            .await
            .insert(wallet.to_string(), state.clone());
        Ok(())
    }
}
