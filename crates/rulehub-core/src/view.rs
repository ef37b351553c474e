//! Query state held on behalf of a front end.
//!
//! `QueryView` owns the filter text, the active category and the sort mode.
//! Every change produces a new [`QueryParams`] snapshot, drops the derived
//! result and tells subscribers. The result is recomputed lazily on the next
//! [`results`](QueryView::results) call.
//!
//! The view also owns the receiving end of the index's ready channel;
//! [`poll`](QueryView::poll) turns a finished usage-cache load into a
//! [`ViewEvent::Refreshed`] so subscribers can re-render the provisional
//! result.

use crate::category::CategoryResolver;
use crate::library::{LibraryEvent, LibraryIndex};
use crate::types::{normalize, QueryParams, QueryResult, SortMode};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::BTreeMap;
use tracing::debug;

/// Notifications published to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Filter, category or sort changed, or a refresh was requested
    Changed,
    /// The usage cache became ready; the previous result was provisional
    Refreshed,
}

/// Mutable query state over a [`LibraryIndex`].
pub struct QueryView {
    index: LibraryIndex,
    params: QueryParams,
    current: Option<QueryResult>,
    subscribers: Vec<Sender<ViewEvent>>,
    ready_rx: Receiver<LibraryEvent>,
}

impl QueryView {
    /// Wrap an index. The view takes over the index's ready channel.
    pub fn new(mut index: LibraryIndex) -> Self {
        let (ready_tx, ready_rx) = unbounded();
        index.set_ready_sender(ready_tx);
        QueryView {
            index,
            params: QueryParams::default(),
            current: None,
            subscribers: Vec::new(),
            ready_rx,
        }
    }

    /// Receive [`ViewEvent`]s from now on.
    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn index(&self) -> &LibraryIndex {
        &self.index
    }

    /// Swap category definitions after a configuration change.
    pub fn set_resolver(&mut self, resolver: CategoryResolver) {
        self.index.set_resolver(resolver);
        self.refresh();
    }

    /// Current query parameters
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn filter(&self) -> Option<&str> {
        self.params.filter.as_deref()
    }

    pub fn active_category(&self) -> Option<&str> {
        self.params.category.as_deref()
    }

    pub fn sort(&self) -> SortMode {
        self.params.sort
    }

    /// Set the substring filter; blank input clears it.
    pub fn set_filter(&mut self, filter: Option<&str>) {
        self.params.filter = normalize(filter);
        self.refresh();
    }

    /// Restrict to one category; blank input shows all enabled categories.
    pub fn set_active_category(&mut self, category: Option<&str>) {
        self.params.category = normalize(category);
        self.refresh();
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.params.sort = sort;
        self.refresh();
    }

    /// Drop the current result and notify subscribers.
    ///
    /// Front ends call this after mutating the library.
    pub fn refresh(&mut self) {
        self.invalidate();
        self.publish(ViewEvent::Changed);
    }

    /// The result for the current parameters, recomputed if stale.
    pub fn results(&mut self) -> &QueryResult {
        let index = &self.index;
        let params = &self.params;
        self.current.get_or_insert_with(|| index.query(params))
    }

    /// Per-category counts for the current filter.
    pub fn category_counts(&self, apply_filter: bool) -> BTreeMap<String, usize> {
        self.index.category_counts(&self.params, apply_filter)
    }

    /// Handle pending index notifications.
    ///
    /// Returns true if the result was invalidated.
    pub fn poll(&mut self) -> bool {
        let mut refreshed = false;
        while let Ok(event) = self.ready_rx.try_recv() {
            match event {
                LibraryEvent::UsageReady { records } => {
                    debug!(records, "Usage cache ready, refreshing view");
                    refreshed = true;
                }
            }
        }
        if refreshed {
            self.invalidate();
            self.publish(ViewEvent::Refreshed);
        }
        refreshed
    }

    /// Receiver for index notifications, for callers that block on it.
    pub fn ready_receiver(&self) -> &Receiver<LibraryEvent> {
        &self.ready_rx
    }

    fn invalidate(&mut self) {
        self.current = None;
    }

    fn publish(&mut self, event: ViewEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::Storage;
    use crate::usage::{InMemoryUsageStore, UsageStore};
    use std::fs;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn make_view(temp_dir: &TempDir) -> (QueryView, Arc<InMemoryUsageStore>) {
        let root = temp_dir.path().join("hub");
        let storage = Storage::new(CategoryResolver::new(&root, &Config::default()));
        storage.ensure_directory_structure().unwrap();
        for rel in ["rule/alpha.md", "rule/beta.md", "prompt/gamma.md"] {
            fs::write(root.join("categories").join(rel), "").unwrap();
        }
        let store = Arc::new(InMemoryUsageStore::new());
        let index = LibraryIndex::new(storage, store.clone());
        (QueryView::new(index), store)
    }

    fn poll_until_refreshed(view: &mut QueryView) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !view.poll() {
            assert!(Instant::now() < deadline, "usage cache never became ready");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_setters_publish_and_invalidate() {
        let temp_dir = TempDir::new().unwrap();
        let (mut view, _) = make_view(&temp_dir);
        let events = view.subscribe();

        assert_eq!(view.results().len(), 3);

        view.set_filter(Some("  ALPHA "));
        assert_eq!(view.filter(), Some("ALPHA"));
        assert_eq!(events.try_recv(), Ok(ViewEvent::Changed));
        assert_eq!(view.results().ids(), vec!["rule/alpha.md"]);

        view.set_filter(Some(""));
        view.set_active_category(Some("prompt"));
        assert_eq!(view.filter(), None);
        assert_eq!(view.active_category(), Some("prompt"));
        assert_eq!(view.results().ids(), vec!["prompt/gamma.md"]);

        view.set_active_category(None);
        view.set_sort(SortMode::NameDesc);
        assert_eq!(
            view.results().ids(),
            vec!["prompt/gamma.md", "rule/beta.md", "rule/alpha.md"]
        );
        assert_eq!(events.try_iter().count(), 4);
    }

    #[test]
    fn test_refresh_after_usage_ready() {
        let temp_dir = TempDir::new().unwrap();
        let (mut view, store) = make_view(&temp_dir);
        let beta = temp_dir.path().join("hub/categories/rule/beta.md");
        store.record_usage(&beta).unwrap();

        let events = view.subscribe();
        view.set_sort(SortMode::UsageDesc);
        assert_eq!(events.try_recv(), Ok(ViewEvent::Changed));

        let first = view.results().clone();
        assert!(first.provisional);
        assert_eq!(first.ids()[0], "rule/alpha.md");

        poll_until_refreshed(&mut view);
        assert_eq!(events.try_recv(), Ok(ViewEvent::Refreshed));

        let second = view.results();
        assert!(!second.provisional);
        assert_eq!(second.ids()[0], "rule/beta.md");
        assert_eq!(second.items[0].used_count, Some(1));
    }

    #[test]
    fn test_set_resolver_refreshes() {
        let temp_dir = TempDir::new().unwrap();
        let (mut view, _) = make_view(&temp_dir);
        let events = view.subscribe();
        assert_eq!(view.results().len(), 3);

        let mut config = Config::default();
        config.categories.get_mut("rule").unwrap().enabled = false;
        view.set_resolver(CategoryResolver::new(temp_dir.path().join("hub"), &config));

        assert_eq!(events.try_recv(), Ok(ViewEvent::Changed));
        assert_eq!(view.results().ids(), vec!["prompt/gamma.md"]);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let (mut view, _) = make_view(&temp_dir);
        let kept = view.subscribe();
        drop(view.subscribe());

        view.refresh();
        assert_eq!(view.subscribers.len(), 1);
        assert_eq!(kept.try_recv(), Ok(ViewEvent::Changed));
    }

    #[test]
    fn test_category_counts_follow_filter() {
        let temp_dir = TempDir::new().unwrap();
        let (mut view, _) = make_view(&temp_dir);
        view.set_filter(Some("a.md"));

        let counts = view.category_counts(true);
        assert_eq!(counts["rule"], 2);
        assert_eq!(counts["prompt"], 1);

        view.set_filter(Some("beta"));
        assert_eq!(view.category_counts(true)["rule"], 1);
        assert_eq!(view.category_counts(false)["rule"], 2);
    }
}
