//! Status command - show the library root and per-category counts.

use crate::app::App;
use rulehub_core::Config;

/// Run the status command.
pub fn run(config: Config, filter: Option<&str>, no_filter: bool) -> anyhow::Result<()> {
    let mut app = App::new(config)?;
    app.view.set_filter(filter);

    println!("RuleHub Library Status");
    println!("======================");
    println!();
    println!("Storage root: {}", app.storage().root().display());
    if let Some(filter) = app.view.filter() {
        if !no_filter {
            println!("Filter:       {}", filter);
        }
    }
    println!();

    let show_counts = app.config.features.show_file_counts;
    let counts = app.view.category_counts(!no_filter);

    println!("Categories:");
    for category in app.storage().resolver().categories() {
        let state = if category.enabled { "" } else { " (disabled)" };
        let extensions = category.extensions.join(", ");
        match counts.get(&category.key) {
            Some(count) if show_counts => {
                println!("  {:<10} {:>5}  [{}]{}", category.key, count, extensions, state)
            }
            _ => println!("  {:<10} {:>5}  [{}]{}", category.key, "", extensions, state),
        }
    }

    if show_counts {
        println!();
        println!("Total: {}", counts.values().sum::<usize>());
    }

    Ok(())
}
