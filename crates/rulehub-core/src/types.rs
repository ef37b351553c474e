//! Core data types for RuleHub.
//!
//! This module defines the query parameters and result items exchanged
//! between the library index and its callers. Items are recomputed on every
//! query and never cached; only usage counters outlive a query.

use crate::usage::UsageRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Identity of an item: category plus filename.
///
/// Rendered as `category/filename`, which is also the text the substring
/// filter is matched against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId {
    pub category: String,
    pub name: String,
}

impl ItemId {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        ItemId {
            category: category.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// One file in a query result.
///
/// ## Usage fields
///
/// `used_count` is `None` while the usage cache is not resident. That is
/// "unknown", which front ends must not render as zero. Once the cache is
/// resident every item has `Some(n)`, with `n = 0` for paths never used. The
/// remaining metadata fields are only known for paths with a usage record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Category and filename
    pub id: ItemId,

    /// Absolute path (primary directory unless the file only exists in the
    /// legacy one)
    pub path: PathBuf,

    /// Size in bytes from usage metadata
    pub size: Option<u64>,

    /// Record creation time from usage metadata
    pub created_at: Option<DateTime<Utc>>,

    /// Last size/path change from usage metadata
    pub updated_at: Option<DateTime<Utc>>,

    /// Last use
    pub last_used_at: Option<DateTime<Utc>>,

    /// Number of uses (None = usage cache not loaded)
    pub used_count: Option<u64>,
}

impl Item {
    /// Create an item without usage information
    pub fn new(category: impl Into<String>, name: impl Into<String>, path: PathBuf) -> Self {
        Item {
            id: ItemId::new(category, name),
            path,
            size: None,
            created_at: None,
            updated_at: None,
            last_used_at: None,
            used_count: None,
        }
    }

    /// Attach usage information from a resident cache.
    ///
    /// `record` is `None` for paths the cache has never seen.
    pub fn with_usage(mut self, record: Option<&UsageRecord>) -> Self {
        match record {
            Some(r) => {
                self.size = Some(r.size);
                self.created_at = Some(r.created_at);
                self.updated_at = Some(r.updated_at);
                self.last_used_at = r.last_used_at;
                self.used_count = Some(r.used_count);
            }
            None => self.used_count = Some(0),
        }
        self
    }

    pub fn category(&self) -> &str {
        &self.id.category
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortMode {
    /// Filename, ascending
    #[default]
    NameAsc,
    /// Filename, descending
    NameDesc,
    /// Category, then filename
    CatName,
    /// Modification time, oldest first
    MtimeAsc,
    /// Modification time, newest first
    MtimeDesc,
    /// Use count, least used first
    UsageAsc,
    /// Use count, most used first
    UsageDesc,
}

impl SortMode {
    pub const ALL: [SortMode; 7] = [
        SortMode::NameAsc,
        SortMode::NameDesc,
        SortMode::CatName,
        SortMode::MtimeAsc,
        SortMode::MtimeDesc,
        SortMode::UsageAsc,
        SortMode::UsageDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::NameAsc => "nameAsc",
            SortMode::NameDesc => "nameDesc",
            SortMode::CatName => "catName",
            SortMode::MtimeAsc => "mtimeAsc",
            SortMode::MtimeDesc => "mtimeDesc",
            SortMode::UsageAsc => "usageAsc",
            SortMode::UsageDesc => "usageDesc",
        }
    }

    /// Whether this mode needs the usage cache
    pub fn is_usage(&self) -> bool {
        matches!(self, SortMode::UsageAsc | SortMode::UsageDesc)
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown sort mode: {}", s))
    }
}

/// Immutable inputs of one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Restrict to one category (None = all enabled categories)
    pub category: Option<String>,

    /// Case-insensitive substring matched against `category/filename`
    pub filter: Option<String>,

    /// Result ordering
    pub sort: SortMode,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the category restriction; blank input clears it
    pub fn with_category(mut self, category: Option<&str>) -> Self {
        self.category = normalize(category);
        self
    }

    /// Set the substring filter; blank input clears it
    pub fn with_filter(mut self, filter: Option<&str>) -> Self {
        self.filter = normalize(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }
}

/// Trim user input, mapping blank strings to None.
pub(crate) fn normalize(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Output of a query.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Matching items, in the requested order
    pub items: Vec<Item>,

    /// True when computed on a cold usage cache. A refreshed result will
    /// follow once the cache is warm; usage sorts fell back to name order.
    pub provisional: bool,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item identities in result order
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.to_string()).collect()
    }
}
