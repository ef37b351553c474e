//! Init command - create the library layout and install starter files.

use crate::app::App;
use rulehub_core::Config;
use std::path::Path;
use tracing::info;

/// Run the init command.
pub fn run(config: Config, starter: Option<&Path>) -> anyhow::Result<()> {
    // Opening the app creates the category directories and the usage document
    let app = App::new(config)?;
    println!("Library ready at {}", app.storage().root().display());

    if let Some(source) = starter {
        let installed = install(&app, source)?;
        println!("Installed {} starter files", installed);
    }

    Ok(())
}

pub(crate) fn install(app: &App, source: &Path) -> anyhow::Result<usize> {
    if !source.is_dir() {
        anyhow::bail!("Starter directory not found: {}", source.display());
    }

    let installed = app.storage().install_starter(source);
    for path in &installed {
        app.usage().touch(path, App::file_size(path))?;
    }

    info!(source = %source.display(), files = installed.len(), "Starter content installed");
    Ok(installed.len())
}
