//! Local fallback deck storage.

use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::models::Format;

use super::StoreError;

/// Directory name under the data directory holding saved decks.
pub const DEFAULT_DECK_DIR: &str = "decks";

/// One card row in a locally saved deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCardLine {
    /// Catalog identifier, absent for cards without a catalog match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_identifier: Option<String>,
    /// Name used when the identifier no longer resolves.
    pub fallback_name: String,
    /// Copies in the deck.
    pub count: u32,
}

/// Snapshot of a deck in the local fallback store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDeckRecord {
    /// Record key: the remote id when `synced`, otherwise a local-only id.
    pub id: String,
    /// Deck name.
    pub name: String,
    /// Deck format.
    #[serde(default)]
    pub format: Format,
    /// Card rows.
    #[serde(default)]
    pub cards: Vec<SavedCardLine>,
    /// Sum of card counts at save time.
    #[serde(default)]
    pub total_count: u32,
    /// First time this id was saved.
    pub created_at: DateTime<Utc>,
    /// Most recent save.
    pub updated_at: DateTime<Utc>,
    /// Whether `id` was issued by the remote store.
    #[serde(default)]
    pub synced: bool,
}

/// Listing entry for a saved deck.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDeckSummary {
    /// Record key.
    pub id: String,
    /// Deck name.
    pub name: String,
    /// Deck format.
    pub format: Format,
    /// Cards in the deck.
    pub total_count: u32,
    /// Most recent save.
    pub updated_at: DateTime<Utc>,
    /// Whether the id belongs to the remote store.
    pub synced: bool,
}

impl From<&SavedDeckRecord> for SavedDeckSummary {
    fn from(record: &SavedDeckRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            format: record.format,
            total_count: record.total_count,
            updated_at: record.updated_at,
            synced: record.synced,
        }
    }
}

/// Keyed table of saved decks.
///
/// Implementations serialise operations on a single key; no further
/// ordering is promised.
pub trait LocalDeckStore: Send + Sync {
    /// Every readable record.
    fn list(&self) -> Result<Vec<SavedDeckRecord>, StoreError>;
    /// Record stored under `id`.
    fn get(&self, id: &str) -> Result<Option<SavedDeckRecord>, StoreError>;
    /// Insert or fully overwrite the record under `record.id`.
    fn put(&self, record: &SavedDeckRecord) -> Result<(), StoreError>;
    /// Remove the record under `id`; missing records are `NotFound`.
    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// One pretty-printed JSON file per deck inside a directory.
#[derive(Debug, Clone)]
pub struct FsDeckStore {
    root: PathBuf,
}

impl FsDeckStore {
    /// Store rooted at the given directory. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Deck directory inside a data directory.
    pub fn in_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(DEFAULT_DECK_DIR))
    }

    /// Directory holding the deck files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_file_stem(id)))
    }

    fn read_record(&self, path: &Path) -> Result<SavedDeckRecord, StoreError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl LocalDeckStore for FsDeckStore {
    fn list(&self) -> Result<Vec<SavedDeckRecord>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match self.read_record(&entry.path()) {
                Ok(record) => records.push(record),
                Err(err) => warn!("Failed to read saved deck {:?}: {err}", entry.path()),
            }
        }
        Ok(records)
    }

    fn get(&self, id: &str) -> Result<Option<SavedDeckRecord>, StoreError> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Ok(None);
        }
        let record = self.read_record(&path)?;
        if record.id != id {
            return Err(StoreError::Invalid(format!(
                "{} holds deck {} instead of {id}",
                path.display(),
                record.id
            )));
        }
        Ok(Some(record))
    }

    fn put(&self, record: &SavedDeckRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let serialised = serde_json::to_vec_pretty(record)?;
        let mut file = NamedTempFile::new_in(&self.root)?;
        file.write_all(&serialised)?;
        file.persist(self.path_for(&record.id))
            .map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}

/// Process-local store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryDeckStore {
    records: RwLock<HashMap<String, SavedDeckRecord>>,
}

impl MemoryDeckStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalDeckStore for MemoryDeckStore {
    fn list(&self) -> Result<Vec<SavedDeckRecord>, StoreError> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Option<SavedDeckRecord>, StoreError> {
        Ok(self.records.read().get(id).cloned())
    }

    fn put(&self, record: &SavedDeckRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// File stem for a deck id. Bytes outside `[A-Za-z0-9_-]` become `%XX`,
/// so distinct ids never share a file.
fn encode_file_stem(id: &str) -> String {
    if id.is_empty() {
        return "%".to_string();
    }
    let mut result = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            result.push(char::from(byte));
        } else {
            result.push_str(&format!("%{byte:02X}"));
        }
    }
    result
}
