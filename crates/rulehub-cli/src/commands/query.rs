//! Query command - list library items.

use crate::app::App;
use crate::OutputFormat;
use rulehub_core::{Config, Item, QueryResult, SortMode};
use std::time::Instant;
use tracing::warn;

/// Run the query command.
pub fn run(
    config: Config,
    filter: Option<&str>,
    category: Option<&str>,
    sort: SortMode,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let mut app = App::new(config)?;

    if filter.is_some() && !app.config.features.enable_search {
        warn!("Search is disabled in the configuration, ignoring filter");
    } else {
        app.view.set_filter(filter);
    }
    app.view.set_active_category(category);
    app.view.set_sort(sort);

    let start = Instant::now();
    let mut results = app.view.results().clone();

    // A usage-sorted result on a cold cache is in name order; wait for the
    // real ranking rather than print it.
    if results.provisional && sort.is_usage() {
        if app.wait_for_usage() {
            results = app.view.results().clone();
        } else {
            warn!("Usage metadata not ready, showing name order");
        }
    }
    let elapsed = start.elapsed();

    match output {
        OutputFormat::Text => print_text(&results, elapsed.as_secs_f64() * 1000.0),
        OutputFormat::Json => {
            let json_results: Vec<serde_json::Value> = results.items.iter().map(item_json).collect();
            println!("{}", serde_json::to_string_pretty(&json_results)?);
        }
    }

    Ok(())
}

fn print_text(results: &QueryResult, elapsed_ms: f64) {
    for item in &results.items {
        match item.used_count {
            Some(count) => println!("{:<48} {:>5} uses", item.id.to_string(), count),
            None => println!("{}", item.id),
        }
    }

    eprintln!();
    eprintln!("Found {} items in {:.3}ms", results.len(), elapsed_ms);
}

fn item_json(item: &Item) -> serde_json::Value {
    serde_json::json!({
        "category": item.category(),
        "name": item.name(),
        "path": item.path,
        "size": item.size,
        "createdAt": item.created_at.map(|t| t.to_rfc3339()),
        "updatedAt": item.updated_at.map(|t| t.to_rfc3339()),
        "lastUsedAt": item.last_used_at.map(|t| t.to_rfc3339()),
        "usedCount": item.used_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_item_json_unknown_usage() {
        let item = Item::new("rule", "style.md", PathBuf::from("/hub/categories/rule/style.md"));
        let value = item_json(&item);

        assert_eq!(value["category"], "rule");
        assert_eq!(value["name"], "style.md");
        assert!(value["usedCount"].is_null());
        assert!(value["lastUsedAt"].is_null());
    }

    #[test]
    fn test_item_json_known_usage() {
        let item = Item::new("rule", "style.md", PathBuf::from("/hub/categories/rule/style.md"))
            .with_usage(None);
        assert_eq!(item_json(&item)["usedCount"], 0);
    }
}
