//! Core RecordStore implementation

use eyre::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key of a record within a collection (e.g. a case reference)
pub type RecordKey = String;

/// Statistics for a collection
#[derive(Debug, Clone)]
pub struct CollectionStats {
    /// Number of records
    pub record_count: usize,
    /// Total bytes stored
    pub total_bytes: u64,
}

/// The main record store
///
/// One directory per collection, one JSON file per record. Writes go
/// through a `.tmp` sibling followed by a rename so a crash never
/// leaves a half-written record behind.
pub struct RecordStore {
    /// Base path for storage
    base_path: PathBuf,
}

impl RecordStore {
    /// Open or create a record store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened record store");
        Ok(Self { base_path })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(collection)
    }

    fn record_path(&self, collection: &str, key: &str) -> PathBuf {
        self.collection_path(collection).join(format!("{}.json", sanitize_key(key)))
    }

    /// Write a record, replacing any previous version atomically
    pub fn put<T: Serialize>(&self, collection: &str, key: &str, record: &T) -> Result<()> {
        let dir = self.collection_path(collection);
        fs::create_dir_all(&dir).context(format!("Failed to create collection directory: {}", collection))?;

        let path = self.record_path(collection, key);
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&tmp_path, content).context(format!("Failed to write record: {}/{}", collection, key))?;
        fs::rename(&tmp_path, &path).context(format!("Failed to commit record: {}/{}", collection, key))?;

        debug!(collection, key, "Record written");
        Ok(())
    }

    /// Read a record by key, returning None if it does not exist
    pub fn get<T: DeserializeOwned>(&self, collection: &str, key: &str) -> Result<Option<T>> {
        let path = self.record_path(collection, key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).context(format!("Failed to read record: {}/{}", collection, key))?;
        let record =
            serde_json::from_str(&content).context(format!("Failed to decode record: {}/{}", collection, key))?;
        Ok(Some(record))
    }

    /// Read the raw JSON of a record (for inspection tooling)
    pub fn get_raw(&self, collection: &str, key: &str) -> Result<Option<String>> {
        let path = self.record_path(collection, key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    /// List all record keys in a collection
    pub fn keys(&self, collection: &str) -> Result<Vec<RecordKey>> {
        let dir = self.collection_path(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Load every record of a collection
    pub fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let mut records = Vec::new();
        for key in self.keys(collection)? {
            if let Some(record) = self.get(collection, &key)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// List all collection names
    pub fn collections(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Get statistics for a collection
    pub fn stats(&self, collection: &str) -> Result<CollectionStats> {
        let dir = self.collection_path(collection);
        if !dir.exists() {
            return Err(eyre::eyre!("Collection not found: {}", collection));
        }

        let mut record_count = 0;
        let mut total_bytes = 0u64;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().extension().map(|e| e == "json").unwrap_or(false) {
                record_count += 1;
                total_bytes += entry.metadata()?.len();
            }
        }

        Ok(CollectionStats {
            record_count,
            total_bytes,
        })
    }

    /// Delete a record; no-op if absent
    pub fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let path = self.record_path(collection, key);
        if path.exists() {
            fs::remove_file(&path)?;
            info!(collection, key, "Deleted record");
        }
        Ok(())
    }
}

/// Replace path-hostile characters so a case reference like
/// "MAND_2024/001" maps to a stable file name.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}
