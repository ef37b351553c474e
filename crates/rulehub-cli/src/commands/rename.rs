//! Rename command - rename a file, carrying its usage record along.

use crate::app::App;
use rulehub_core::Config;
use std::path::PathBuf;

/// Run the rename command.
pub fn run(config: Config, category: &str, old_name: &str, new_name: &str) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let (old_path, new_path) = rename(&app, category, old_name, new_name)?;
    println!("Renamed {} -> {}", old_path.display(), new_path.display());
    Ok(())
}

pub(crate) fn rename(
    app: &App,
    category: &str,
    old_name: &str,
    new_name: &str,
) -> anyhow::Result<(PathBuf, PathBuf)> {
    let storage = app.storage();
    let new_name = storage.ensure_extension(category, new_name);
    let (old_path, new_path) = storage.rename_file(category, old_name, &new_name)?;
    app.usage().rename(&old_path, &new_path)?;
    Ok((old_path, new_path))
}
