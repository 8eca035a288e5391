// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Persisted session slots.
//!
//! The durable half of a session is a handful of small named strings: the
//! session id plus cached copies of the last retrieved share fields. The
//! store is injected behind [`KeyValueStore`] so the manager stays pure and
//! tests can run against the in-memory implementation.
//!
//! The persisted slots are the source of truth across process restarts; the
//! manager holds no session state of its own between operations.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Fixed slot names addressed by the session manager.
pub mod slots {
    /// Hex private scalar; doubles as the session id. Secret.
    pub const SESSION_ID: &str = "SESSION_ID";
    /// Ephemeral public key of the last retrieved share.
    pub const EPHEM_PUBLIC_KEY: &str = "EPHEM_PUBLIC_KEY";
    /// IV of the last retrieved share, 32 hex chars.
    pub const IV: &str = "IV";
    /// MAC tag of the last retrieved share.
    pub const MAC: &str = "MAC";
}

/// Small-string key/value persistence surface.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, slot: &str) -> Result<Option<String>>;

    async fn set(&self, slot: &str, value: &str) -> Result<()>;

    async fn delete(&self, slot: &str) -> Result<()>;
}

/// Thread-safe in-memory store. The default for tests and for hosts that
/// manage durability themselves.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, slot: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(slot).cloned())
    }

    async fn set(&self, slot: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(slot.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, slot: &str) -> Result<()> {
        self.entries.write().await.remove(slot);
        Ok(())
    }
}

/// File-backed store holding all slots in one JSON document.
///
/// Writes go through a temp file and an atomic rename so a crash mid-write
/// never leaves a torn file behind.
pub struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string(entries)?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, slot: &str) -> Result<Option<String>> {
        Ok(self.load().await?.get(slot).cloned())
    }

    async fn set(&self, slot: &str, value: &str) -> Result<()> {
        let mut entries = self.load().await?;
        entries.insert(slot.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn delete(&self, slot: &str) -> Result<()> {
        let mut entries = self.load().await?;
        if entries.remove(slot).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }
}
