//! The library query engine.
//!
//! `LibraryIndex::query` turns immutable [`QueryParams`] into an ordered,
//! flat list of items drawn from every targeted category. Nothing about the
//! result is cached; every call re-lists the category directories.
//!
//! ## Usage cache
//!
//! Usage counters come from the [`UsageStore`] and are held in memory once
//! loaded. The first query that finds the cache cold starts a background
//! load and answers immediately:
//!
//! - usage sorts fall back to name order,
//! - items carry no usage fields,
//! - the result is marked provisional.
//!
//! When the load finishes, [`LibraryEvent::UsageReady`] is sent on the ready
//! channel supplied by the caller, who is expected to query again. The cache
//! then stays resident until [`LibraryIndex::reload_usage`] or
//! [`LibraryIndex::invalidate_usage`]; it does not follow later writes to the
//! store on its own.

use crate::category::CategoryResolver;
use crate::error::{Result, RuleHubError};
use crate::files;
use crate::storage::Storage;
use crate::types::{Item, QueryParams, QueryResult, SortMode};
use crate::usage::{UsageRecord, UsageStore};
use crossbeam_channel::Sender;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, instrument, warn};

/// Resident usage records keyed by absolute path
pub type UsageSnapshot = Arc<HashMap<PathBuf, UsageRecord>>;

/// Notifications sent by the index to its caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    /// The usage cache finished loading; earlier results were provisional
    UsageReady { records: usize },
}

/// Lazily loaded usage records shared with the warm-up thread.
#[derive(Default)]
struct UsageCache {
    snapshot: RwLock<Option<UsageSnapshot>>,
    warming: AtomicBool,
}

impl UsageCache {
    fn get(&self) -> Result<UsageSnapshot> {
        self.snapshot
            .read()
            .clone()
            .ok_or(RuleHubError::CacheUnready)
    }

    fn set(&self, records: HashMap<PathBuf, UsageRecord>) -> usize {
        let count = records.len();
        *self.snapshot.write() = Some(Arc::new(records));
        count
    }

    /// Install `records` unless a snapshot is already resident.
    ///
    /// Returns the resident record count and whether `records` was used.
    fn set_if_empty(&self, records: HashMap<PathBuf, UsageRecord>) -> (usize, bool) {
        let mut snapshot = self.snapshot.write();
        match snapshot.as_ref() {
            Some(current) => (current.len(), false),
            None => {
                let count = records.len();
                *snapshot = Some(Arc::new(records));
                (count, true)
            }
        }
    }

    fn clear(&self) {
        *self.snapshot.write() = None;
    }
}

/// Query engine over a [`Storage`] and a [`UsageStore`].
pub struct LibraryIndex {
    storage: Storage,
    store: Arc<dyn UsageStore>,
    cache: Arc<UsageCache>,
    ready: Option<Sender<LibraryEvent>>,
}

impl LibraryIndex {
    /// Create an index with a cold usage cache.
    pub fn new(storage: Storage, store: Arc<dyn UsageStore>) -> Self {
        LibraryIndex {
            storage,
            store,
            cache: Arc::new(UsageCache::default()),
            ready: None,
        }
    }

    /// Deliver [`LibraryEvent`]s on `sender`.
    pub fn with_ready_sender(mut self, sender: Sender<LibraryEvent>) -> Self {
        self.ready = Some(sender);
        self
    }

    pub fn set_ready_sender(&mut self, sender: Sender<LibraryEvent>) {
        self.ready = Some(sender);
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Swap category definitions, e.g. after the configuration changed.
    ///
    /// The usage cache is keyed by path and stays valid.
    pub fn set_resolver(&mut self, resolver: CategoryResolver) {
        debug!(root = %resolver.root().display(), "Category definitions replaced");
        self.storage.set_resolver(resolver);
    }

    pub fn usage_store(&self) -> &Arc<dyn UsageStore> {
        &self.store
    }

    /// Whether usage records are resident
    pub fn is_usage_ready(&self) -> bool {
        self.cache.get().is_ok()
    }

    /// Run a query.
    ///
    /// Never fails: unreadable directories contribute no items and failed
    /// stats sort as the epoch.
    #[instrument(skip(self), fields(items = tracing::field::Empty))]
    pub fn query(&self, params: &QueryParams) -> QueryResult {
        let usage = self.cache.get();
        let provisional = usage.is_err();
        if provisional {
            self.warm_usage();
        }
        let usage = usage.ok();

        let needle = params.filter.as_deref().map(str::to_lowercase);
        let targets = self.target_categories(params);

        let per_category: Vec<Vec<Item>> = targets
            .par_iter()
            .map(|category| {
                self.storage
                    .list_entries(category)
                    .into_iter()
                    .filter(|entry| matches_filter(category, &entry.name, needle.as_deref()))
                    .map(|entry| {
                        let item = Item::new(category.as_str(), entry.name, entry.path);
                        match &usage {
                            Some(records) => {
                                let record = records.get(&item.path);
                                item.with_usage(record)
                            }
                            None => item,
                        }
                    })
                    .collect()
            })
            .collect();
        let mut items: Vec<Item> = per_category.into_iter().flatten().collect();

        let sort = match params.sort {
            mode if mode.is_usage() && provisional => {
                debug!(requested = %mode, "Usage cache cold, sorting by name");
                SortMode::NameAsc
            }
            mode => mode,
        };
        sort_items(&mut items, sort);

        tracing::Span::current().record("items", items.len());
        QueryResult { items, provisional }
    }

    /// Count matching files per enabled category.
    ///
    /// Ignores the category restriction of `params`; with `apply_filter`
    /// the substring filter is applied as in [`query`](Self::query).
    pub fn category_counts(&self, params: &QueryParams, apply_filter: bool) -> BTreeMap<String, usize> {
        let needle = params
            .filter
            .as_deref()
            .filter(|_| apply_filter)
            .map(str::to_lowercase);

        self.storage
            .resolver()
            .enabled_categories()
            .into_par_iter()
            .map(|category| {
                let count = self
                    .storage
                    .list_files(&category)
                    .iter()
                    .filter(|name| matches_filter(&category, name, needle.as_deref()))
                    .count();
                (category, count)
            })
            .collect()
    }

    /// Start loading the usage cache in the background.
    ///
    /// Returns false if the cache is already resident or a load is in
    /// flight. A failed load leaves an empty resident cache.
    pub fn warm_usage(&self) -> bool {
        if self.cache.get().is_ok() || self.cache.warming.swap(true, AtomicOrdering::AcqRel) {
            return false;
        }

        let cache = Arc::clone(&self.cache);
        let store = Arc::clone(&self.store);
        let ready = self.ready.clone();

        let spawned = thread::Builder::new()
            .name("rulehub-usage-warm".to_string())
            .spawn(move || {
                let records = match store.load() {
                    Ok(document) => document.into_map(),
                    Err(err) => {
                        warn!(error = %err, "Failed to load usage metadata, using empty cache");
                        HashMap::new()
                    }
                };
                // A reload that finished first holds newer data
                let (count, installed) = cache.set_if_empty(records);
                cache.warming.store(false, AtomicOrdering::Release);
                if installed {
                    info!(records = count, "Usage cache ready");
                } else {
                    debug!(records = count, "Usage cache already reloaded, discarding warm load");
                }

                if let Some(ready) = ready {
                    let _ = ready.send(LibraryEvent::UsageReady { records: count });
                }
            });

        match spawned {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "Could not start usage cache load");
                self.cache.warming.store(false, AtomicOrdering::Release);
                false
            }
        }
    }

    /// Reload the usage cache synchronously.
    ///
    /// On error the previous cache is kept.
    pub fn reload_usage(&self) -> Result<usize> {
        let document = self.store.load()?;
        let count = self.cache.set(document.into_map());
        info!(records = count, "Usage cache reloaded");
        Ok(count)
    }

    /// Drop the usage cache; the next query starts a new background load.
    pub fn invalidate_usage(&self) {
        self.cache.clear();
    }

    /// Usage records currently resident.
    pub fn usage_snapshot(&self) -> Result<UsageSnapshot> {
        self.cache.get()
    }

    /// Enabled categories narrowed by the category restriction.
    fn target_categories(&self, params: &QueryParams) -> Vec<String> {
        let enabled = self.storage.resolver().enabled_categories();
        match params.category.as_deref() {
            Some(active) => enabled.into_iter().filter(|c| c == active).collect(),
            None => enabled,
        }
    }
}

/// Substring test against `category/name`; `needle` is already lowercase.
fn matches_filter(category: &str, name: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => format!("{}/{}", category, name)
            .to_lowercase()
            .contains(needle),
        None => true,
    }
}

/// Locale-style string order: case-folded first, raw bytes to break ties.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Filename order. Category and path only break ties between equal names
/// so the order is total and `NameDesc` is its exact reverse.
fn name_order(a: &Item, b: &Item) -> Ordering {
    collate(a.name(), b.name())
        .then_with(|| collate(a.category(), b.category()))
        .then_with(|| a.path.cmp(&b.path))
}

fn sort_items(items: &mut Vec<Item>, mode: SortMode) {
    match mode {
        SortMode::NameAsc => items.sort_by(name_order),
        SortMode::NameDesc => items.sort_by(|a, b| name_order(b, a)),
        SortMode::CatName => items.sort_by(|a, b| {
            collate(a.category(), b.category()).then_with(|| name_order(a, b))
        }),
        SortMode::MtimeAsc | SortMode::MtimeDesc => {
            let mtimes: Vec<u128> = items
                .par_iter()
                .map(|item| files::modified_millis_or_epoch(&item.path))
                .collect();
            let mut keyed: Vec<(u128, Item)> = mtimes.into_iter().zip(items.drain(..)).collect();
            keyed.sort_by(|(am, a), (bm, b)| {
                let by_time = if mode == SortMode::MtimeAsc {
                    am.cmp(bm)
                } else {
                    bm.cmp(am)
                };
                by_time.then_with(|| name_order(a, b))
            });
            items.extend(keyed.into_iter().map(|(_, item)| item));
        }
        SortMode::UsageAsc | SortMode::UsageDesc => items.sort_by(|a, b| {
            let au = a.used_count.unwrap_or(0);
            let bu = b.used_count.unwrap_or(0);
            let by_usage = if mode == SortMode::UsageAsc {
                au.cmp(&bu)
            } else {
                bu.cmp(&au)
            };
            by_usage.then_with(|| name_order(a, b))
        }),
    }
}
