//! Category resolution.
//!
//! A category key maps to a primary directory under
//! `<storage_root>/categories/<key>`. Some keys were renamed over time (the
//! plural forms were dropped); files created under the retired key still live
//! in the old directory, so the resolver also reports that directory as a
//! legacy location for read-side merging. Nothing is ever written there.

use crate::config::Config;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Retired category keys and the current key they resolve to.
pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("rules", "rule"),
    ("prompts", "prompt"),
    ("workflows", "workflow"),
];

/// Subdirectory of the storage root holding one directory per category
pub const CATEGORIES_DIR: &str = "categories";

/// A category definition as seen by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Stable, case-sensitive key
    pub key: String,

    /// Whether the category participates in queries
    pub enabled: bool,

    /// Allowed filename suffixes, matched case-insensitively
    pub extensions: Vec<String>,

    /// Retired key whose directory is still merged on read
    pub legacy_alias: Option<&'static str>,
}

/// Directories backing a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDirs {
    /// Where new files are written
    pub primary: PathBuf,

    /// Directory of the retired key, if the category has one
    pub legacy: Option<PathBuf>,
}

/// Maps category keys to directories and extension sets.
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    root: PathBuf,
    categories: BTreeMap<String, Category>,
}

impl CategoryResolver {
    /// Build a resolver for `root` from the category section of `config`.
    pub fn new(root: impl AsRef<Path>, config: &Config) -> Self {
        let mut resolver = CategoryResolver {
            root: root.as_ref().to_path_buf(),
            categories: BTreeMap::new(),
        };
        resolver.reload(config);
        resolver
    }

    /// Re-read category definitions after a structural change.
    pub fn reload(&mut self, config: &Config) {
        self.categories = config
            .categories
            .iter()
            .map(|(key, c)| {
                let category = Category {
                    key: key.clone(),
                    enabled: c.enabled,
                    extensions: c.file_extensions.clone(),
                    legacy_alias: legacy_alias(key),
                };
                (key.clone(), category)
            })
            .collect();
    }

    /// The storage root this resolver is anchored at
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the directories for a category.
    ///
    /// Unknown categories still get a primary path; it may not exist yet.
    pub fn resolve(&self, category: &str) -> CategoryDirs {
        let base = self.root.join(CATEGORIES_DIR);
        CategoryDirs {
            primary: base.join(category),
            legacy: legacy_alias(category).map(|old| base.join(old)),
        }
    }

    /// Allowed suffixes for a category (empty for unknown categories).
    pub fn allowed_extensions(&self, category: &str) -> &[String] {
        self.categories
            .get(category)
            .map(|c| c.extensions.as_slice())
            .unwrap_or(&[])
    }

    /// Keys of all enabled categories, in key order.
    pub fn enabled_categories(&self) -> Vec<String> {
        self.categories
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.key.clone())
            .collect()
    }

    /// All configured categories, enabled or not.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// Whether the key is configured
    pub fn is_known(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// Whether the key is configured and enabled
    pub fn is_enabled(&self, category: &str) -> bool {
        self.categories.get(category).is_some_and(|c| c.enabled)
    }
}

/// The retired key for a current category key.
pub fn legacy_alias(current: &str) -> Option<&'static str> {
    LEGACY_ALIASES
        .iter()
        .find(|(_, now)| *now == current)
        .map(|(old, _)| *old)
}

/// The current key for a retired category key.
pub fn current_key(legacy: &str) -> Option<&'static str> {
    LEGACY_ALIASES
        .iter()
        .find(|(old, _)| *old == legacy)
        .map(|(_, now)| *now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_resolver() -> CategoryResolver {
        CategoryResolver::new("/data/hub", &Config::default())
    }

    #[test]
    fn test_resolve_with_legacy() {
        let resolver = make_resolver();
        let dirs = resolver.resolve("rule");
        assert_eq!(dirs.primary, PathBuf::from("/data/hub/categories/rule"));
        assert_eq!(
            dirs.legacy,
            Some(PathBuf::from("/data/hub/categories/rules"))
        );
    }

    #[test]
    fn test_resolve_without_legacy() {
        let resolver = make_resolver();
        let dirs = resolver.resolve("mcp");
        assert_eq!(dirs.primary, PathBuf::from("/data/hub/categories/mcp"));
        assert_eq!(dirs.legacy, None);
    }

    #[test]
    fn test_unknown_category() {
        let resolver = make_resolver();
        assert!(resolver.allowed_extensions("snippets").is_empty());
        assert!(!resolver.is_known("snippets"));
        assert_eq!(
            resolver.resolve("snippets").primary,
            PathBuf::from("/data/hub/categories/snippets")
        );
    }

    #[test]
    fn test_allowed_extensions() {
        let resolver = make_resolver();
        assert_eq!(resolver.allowed_extensions("mcp"), [".json".to_string()]);
        assert_eq!(resolver.allowed_extensions("rule"), [".md".to_string()]);
    }

    #[test]
    fn test_alias_table_is_one_to_one() {
        for (old, now) in LEGACY_ALIASES {
            assert_eq!(legacy_alias(now), Some(*old));
            assert_eq!(current_key(old), Some(*now));
        }
        assert_eq!(legacy_alias("mcp"), None);
        assert_eq!(current_key("rule"), None);
    }

    #[test]
    fn test_reload_picks_up_disabled() {
        let mut config = Config::default();
        let mut resolver = CategoryResolver::new("/data/hub", &config);
        assert!(resolver.is_enabled("agent"));

        config.categories.get_mut("agent").unwrap().enabled = false;
        resolver.reload(&config);
        assert!(!resolver.is_enabled("agent"));
        assert!(resolver.is_known("agent"));
        assert_eq!(
            resolver.enabled_categories(),
            vec!["mcp", "prompt", "rule", "workflow"]
        );
    }
}
