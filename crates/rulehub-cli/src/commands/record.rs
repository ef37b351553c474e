//! Use command - count one use of a library file.

use crate::app::App;
use rulehub_core::{Config, RuleHubError};
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the use command.
pub fn run(config: Config, path: &Path) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let path = record(&app, &App::absolute(path)?)?;
    println!("Recorded use of {}", path.display());
    Ok(())
}

/// Record a use of `path`, refusing files outside the library.
///
/// The record is keyed by the path as the library lists it, which is
/// returned.
pub(crate) fn record(app: &App, path: &Path) -> anyhow::Result<PathBuf> {
    let path = app.storage().managed_path(path)?;
    if !path.is_file() {
        return Err(RuleHubError::FileNotFound { path }.into());
    }

    app.usage().record_usage(&path)?;
    info!(path = %path.display(), "Recorded usage");
    Ok(path)
}
