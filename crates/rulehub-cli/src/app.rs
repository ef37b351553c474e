//! Application state management.

use rulehub_core::{
    CategoryResolver, Config, JsonUsageStore, LibraryEvent, LibraryIndex, QueryView, Storage,
    UsageStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How long a command waits for the usage cache before printing what it has
const USAGE_WAIT: Duration = Duration::from_secs(5);

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// Query state over the library
    pub view: QueryView,
}

impl App {
    /// Open the library named by `config`, creating its layout if needed.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let root = config.storage_root()?;
        let storage = Storage::new(CategoryResolver::new(&root, &config));
        storage.ensure_directory_structure()?;

        let store = JsonUsageStore::new(&root);
        store.init()?;

        info!(
            root = %root.display(),
            categories = storage.resolver().enabled_categories().len(),
            "Application initialized"
        );

        let index = LibraryIndex::new(storage, Arc::new(store));
        Ok(App {
            config,
            view: QueryView::new(index),
        })
    }

    pub fn storage(&self) -> &Storage {
        self.view.index().storage()
    }

    pub fn usage(&self) -> &Arc<dyn UsageStore> {
        self.view.index().usage_store()
    }

    /// Block until the usage cache is resident, up to a fixed timeout.
    ///
    /// Returns false if the wait timed out.
    pub fn wait_for_usage(&mut self) -> bool {
        if self.view.index().is_usage_ready() {
            return true;
        }
        self.view.index().warm_usage();
        match self.view.ready_receiver().recv_timeout(USAGE_WAIT) {
            Ok(LibraryEvent::UsageReady { records }) => {
                debug!(records, "Usage cache ready");
                self.view.poll();
                true
            }
            Err(_) => false,
        }
    }

    /// Resolve a user-supplied path against the working directory.
    pub fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(std::env::current_dir()?.join(path))
        }
    }

    /// Size of a library file after a mutation
    pub fn file_size(path: &Path) -> u64 {
        rulehub_core::storage::file_size(path)
    }
}
