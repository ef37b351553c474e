//! Create command - add a file to a category.

use crate::app::App;
use rulehub_core::Config;
use std::path::PathBuf;

/// Run the create command.
pub fn run(config: Config, category: &str, name: &str, content: &str) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let path = create(&app, category, name, content)?;
    println!("Created {}", path.display());
    Ok(())
}

pub(crate) fn create(
    app: &App,
    category: &str,
    name: &str,
    content: &str,
) -> anyhow::Result<PathBuf> {
    let storage = app.storage();
    if !storage.resolver().is_known(category) {
        anyhow::bail!("Unknown category: {}", category);
    }

    let name = storage.ensure_extension(category, name);
    let path = storage.create_file(category, &name, content.as_bytes())?;
    app.usage().touch(&path, App::file_size(&path))?;
    Ok(path)
}
