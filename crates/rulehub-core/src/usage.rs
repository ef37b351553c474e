//! Per-path usage metadata.
//!
//! Usage statistics live in a single JSON document under
//! `<storage_root>/metadata/file-meta.json`:
//!
//! ```text
//! { "files": [ { "path", "size", "createdAt", "updatedAt",
//!                "lastUsedAt"?, "usedCount"? }, ... ] }
//! ```
//!
//! Timestamps are milliseconds since the Unix epoch. Every mutation is a
//! whole-document read-modify-write without locking or versioning, so two
//! writers racing on the same document lose one update (last writer wins).

use crate::error::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Subdirectory of the storage root holding metadata
pub const METADATA_DIR: &str = "metadata";

/// File name of the usage document
pub const METADATA_FILE: &str = "file-meta.json";

/// Usage statistics for one managed path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// Absolute path of the file
    pub path: PathBuf,

    /// Size in bytes at the last touch
    #[serde(default)]
    pub size: u64,

    /// When the record was first created
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// When size or path last changed
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,

    /// When the file was last used
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub last_used_at: Option<DateTime<Utc>>,

    /// How many times the file was used
    #[serde(default)]
    pub used_count: u64,

    /// Content hash, preserved but not interpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl UsageRecord {
    /// A fresh zero-usage record
    pub fn new(path: impl Into<PathBuf>, size: u64, now: DateTime<Utc>) -> Self {
        UsageRecord {
            path: path.into(),
            size,
            created_at: now,
            updated_at: now,
            last_used_at: None,
            used_count: 0,
            hash: None,
        }
    }
}

/// The persisted usage document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDocument {
    #[serde(default)]
    pub files: Vec<UsageRecord>,
}

impl UsageDocument {
    /// Look up the record for a path
    pub fn get(&self, path: &Path) -> Option<&UsageRecord> {
        self.files.iter().find(|f| f.path == path)
    }

    fn get_mut(&mut self, path: &Path) -> Option<&mut UsageRecord> {
        self.files.iter_mut().find(|f| f.path == path)
    }

    /// Count one use of `path` at `now`, creating the record if absent.
    pub fn record_usage_at(&mut self, path: &Path, now: DateTime<Utc>) {
        if let Some(record) = self.get_mut(path) {
            record.used_count += 1;
            record.last_used_at = Some(now);
        } else {
            let mut record = UsageRecord::new(path, 0, now);
            record.used_count = 1;
            record.last_used_at = Some(now);
            self.files.push(record);
        }
    }

    /// Update size and `updated_at`, keeping usage fields.
    pub fn touch_at(&mut self, path: &Path, size: u64, now: DateTime<Utc>) {
        if let Some(record) = self.get_mut(path) {
            record.size = size;
            record.updated_at = now;
        } else {
            self.files.push(UsageRecord::new(path, size, now));
        }
    }

    /// Drop the record for `path`. Returns whether one existed.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.path != path);
        self.files.len() != before
    }

    /// Move a record to a new path. No-op if `old` is unknown.
    pub fn rename_at(&mut self, old: &Path, new: &Path, now: DateTime<Utc>) -> bool {
        match self.get_mut(old) {
            Some(record) => {
                record.path = new.to_path_buf();
                record.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// Index records by path
    pub fn into_map(self) -> HashMap<PathBuf, UsageRecord> {
        self.files
            .into_iter()
            .map(|record| (record.path.clone(), record))
            .collect()
    }
}

/// Persistence contract for usage metadata.
///
/// Implementors provide `load` and `save`; the mutations are whole-document
/// read-modify-write cycles on top of them.
pub trait UsageStore: Send + Sync {
    /// Read the whole document
    fn load(&self) -> Result<UsageDocument>;

    /// Replace the whole document
    fn save(&self, document: &UsageDocument) -> Result<()>;

    /// Increment the use counter of `path` and stamp `last_used_at`.
    fn record_usage(&self, path: &Path) -> Result<()> {
        let mut document = self.load()?;
        document.record_usage_at(path, Utc::now());
        self.save(&document)
    }

    /// Record a size change of `path`.
    fn touch(&self, path: &Path, size: u64) -> Result<()> {
        let mut document = self.load()?;
        document.touch_at(path, size, Utc::now());
        self.save(&document)
    }

    /// Forget `path`.
    fn remove(&self, path: &Path) -> Result<()> {
        let mut document = self.load()?;
        if document.remove(path) {
            self.save(&document)?;
        }
        Ok(())
    }

    /// Carry the record of `old` over to `new`.
    fn rename(&self, old: &Path, new: &Path) -> Result<()> {
        let mut document = self.load()?;
        if document.rename_at(old, new, Utc::now()) {
            self.save(&document)?;
        }
        Ok(())
    }
}

/// Usage store backed by `file-meta.json`.
pub struct JsonUsageStore {
    path: PathBuf,
}

impl JsonUsageStore {
    /// Store for the library rooted at `storage_root`.
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        JsonUsageStore {
            path: storage_root
                .as_ref()
                .join(METADATA_DIR)
                .join(METADATA_FILE),
        }
    }

    /// Location of the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Create an empty document if none exists yet.
    pub fn init(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        info!(path = %self.path.display(), "Creating usage metadata");
        self.save(&UsageDocument::default())
    }
}

impl UsageStore for JsonUsageStore {
    fn load(&self) -> Result<UsageDocument> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Usage metadata not found, starting empty");
            return Ok(UsageDocument::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        let document: UsageDocument = serde_json::from_str(&contents)?;
        debug!(records = document.files.len(), "Usage metadata loaded");
        Ok(document)
    }

    /// Write to a temp file, then rename over the document.
    fn save(&self, document: &UsageDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!(records = document.files.len(), "Usage metadata saved");
        Ok(())
    }
}

/// Usage store kept in memory.
#[derive(Default)]
pub struct InMemoryUsageStore {
    document: Mutex<UsageDocument>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UsageStore for InMemoryUsageStore {
    fn load(&self) -> Result<UsageDocument> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &UsageDocument) -> Result<()> {
        *self.document.lock() = document.clone();
        Ok(())
    }
}
