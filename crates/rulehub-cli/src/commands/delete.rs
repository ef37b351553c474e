//! Delete command - remove a file and its usage record.

use crate::app::App;
use rulehub_core::Config;
use std::path::PathBuf;

/// Run the delete command.
pub fn run(config: Config, category: &str, name: &str) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let path = delete(&app, category, name)?;
    println!("Deleted {}", path.display());
    Ok(())
}

pub(crate) fn delete(app: &App, category: &str, name: &str) -> anyhow::Result<PathBuf> {
    let path = app.storage().delete_file(category, name)?;
    app.usage().remove(&path)?;
    Ok(path)
}
