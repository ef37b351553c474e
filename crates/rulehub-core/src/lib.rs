//! # RuleHub Core Library
//!
//! This crate manages a local library of AI-assistant text assets (rules,
//! prompts, agents, workflows, MCP configurations) stored as plain files
//! under a storage root, grouped into category directories.
//!
//! ## Architecture
//!
//! - **Config** (`config`): TOML configuration, category definitions and migration
//! - **Categories** (`category`): Category keys, legacy aliases and directory resolution
//! - **Files** (`files`): Directory listing, containment checks and stat helpers
//! - **Storage** (`storage`): The storage contract plus file create/delete/rename
//! - **Usage** (`usage`): Per-file usage records and their persistence
//! - **Library** (`library`): Query engine with a lazily warmed usage cache
//! - **View** (`view`): Filter/category/sort state with change notification
//!
//! ## Example
//!
//! ```rust,ignore
//! use rulehub_core::{CategoryResolver, Config, JsonUsageStore, LibraryIndex, QueryParams, Storage};
//! use std::sync::Arc;
//!
//! let config = Config::load()?;
//! let root = config.storage_root()?;
//! let storage = Storage::new(CategoryResolver::new(&root, &config));
//! let index = LibraryIndex::new(storage, Arc::new(JsonUsageStore::new(&root)));
//!
//! let result = index.query(&QueryParams::new().with_filter(Some("style")));
//! for item in &result.items {
//!     println!("{} {}", item.id, item.path.display());
//! }
//! ```

pub mod category;
pub mod config;
pub mod error;
pub mod files;
pub mod library;
pub mod storage;
pub mod types;
pub mod usage;
pub mod view;

// Re-export commonly used types
pub use category::{Category, CategoryDirs, CategoryResolver};
pub use config::Config;
pub use error::{Result, RuleHubError};
pub use library::{LibraryEvent, LibraryIndex, UsageSnapshot};
pub use storage::{FileEntry, Storage};
pub use types::{Item, ItemId, QueryParams, QueryResult, SortMode};
pub use usage::{InMemoryUsageStore, JsonUsageStore, UsageDocument, UsageRecord, UsageStore};
pub use view::{QueryView, ViewEvent};
