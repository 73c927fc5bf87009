// src/state.rs

//! Single-slot persistence for the last-seen item.
//!
//! The state file is one human-readable JSON object, overwritten wholesale
//! on each update. Reads are tolerant: missing or corrupted state is
//! reported as "no prior item", never as an error. Writes are atomic
//! (temp file + rename), so an interrupted write leaves the prior state
//! intact.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::Item;

/// On-disk shape of the state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    /// ISO 8601 timestamp of the last write
    pub updated_at: DateTime<Utc>,
    /// The last-seen item
    pub item: Item,
}

/// Stores exactly one [`Item`] on the local filesystem.
#[derive(Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the last-seen item.
    ///
    /// Missing or unreadable state yields `None` with a logged warning;
    /// the next classification then behaves as a first observation.
    pub async fn load(&self) -> Option<Item> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Failed to read state from {:?}: {}", self.path, e);
                return None;
            }
        };

        match serde_json::from_slice::<PersistedState>(&bytes) {
            Ok(state) => Some(state.item),
            Err(e) => {
                log::warn!(
                    "State file {:?} is corrupted, treating as absent: {}",
                    self.path,
                    e
                );
                None
            }
        }
    }

    /// Persist the item as the new baseline.
    ///
    /// Best-effort from the cycle's point of view: the caller logs a
    /// failure and continues, accepting a stale comparison next cycle.
    pub async fn save(&self, item: &Item) -> Result<()> {
        let state = PersistedState {
            updated_at: Utc::now(),
            item: item.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&state)?;
        self.write_atomic(&bytes).await
    }

    /// Write to a temp file, then rename over the target.
    async fn write_atomic(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_item() -> Item {
        Item::new(
            "Energy Market Outlook 2025",
            "https://example.org/pubs/outlook-2025",
            "31 August 2025",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn round_trip_preserves_all_fields() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("last_seen.json"));

        let item = sample_item();
        store.save(&item).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, item);
    }

    #[tokio::test]
    async fn missing_state_loads_as_none() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("nope.json"));

        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn corrupted_state_loads_as_none() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("last_seen.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = StateStore::new(&path);
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("nested/dir/last_seen.json"));

        store.save(&sample_item()).await.unwrap();
        assert!(store.load().await.is_some());
    }

    #[tokio::test]
    async fn save_overwrites_previous_state() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("last_seen.json"));

        store.save(&sample_item()).await.unwrap();
        let newer = Item::new("Newer Report", "https://example.org/pubs/2", "Unknown").unwrap();
        store.save(&newer).await.unwrap();

        assert_eq!(store.load().await.unwrap(), newer);
    }
}
