//! Error types for RuleHub core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while the CLI uses `anyhow` on top of them.
//!
//! Not every variant reaches a caller. Listing, stat and cache failures are
//! produced internally and then degraded to a safe default by the query path;
//! they exist as variants so the degradation points can log them uniformly.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using RuleHubError
pub type Result<T> = std::result::Result<T, RuleHubError>;

/// Core error types for RuleHub operations.
#[derive(Error, Debug)]
pub enum RuleHubError {
    // === Containment ===
    /// A mutation target lies outside the storage root
    #[error("path is not managed by this library: {path}")]
    NotManaged { path: PathBuf },

    /// A filename that would escape its category directory
    #[error("invalid file name: {name:?}")]
    InvalidName { name: String },

    // === Degradable conditions ===
    /// A category directory could not be listed
    #[error("directory unavailable: {path}: {reason}")]
    DirectoryUnavailable { path: PathBuf, reason: String },

    /// File metadata could not be read
    #[error("stat unavailable for {path}: {reason}")]
    StatUnavailable { path: PathBuf, reason: String },

    /// The usage cache has not been loaded yet
    #[error("usage cache is not loaded")]
    CacheUnready,

    // === Mutations ===
    /// Creation target already exists
    #[error("file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Mutation target does not exist
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RuleHubError {
    /// Returns true if the query path degrades this error instead of raising it
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            RuleHubError::DirectoryUnavailable { .. }
                | RuleHubError::StatUnavailable { .. }
                | RuleHubError::CacheUnready
        )
    }

    /// Returns true if the operation was refused before touching the filesystem
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            RuleHubError::NotManaged { .. } | RuleHubError::InvalidName { .. }
        )
    }

    /// Create a directory-unavailable error
    pub fn directory_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        RuleHubError::DirectoryUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a stat-unavailable error
    pub fn stat_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        RuleHubError::StatUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for RuleHubError {
    fn from(err: serde_json::Error) -> Self {
        RuleHubError::Serialization(err.to_string())
    }
}
