//! Library storage on disk.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/categories/<key>/...   one directory per category
//! <root>/categories/<legacy>/... retired directories, read-merged only
//! <root>/metadata/file-meta.json
//! ```
//!
//! Reads merge the primary and legacy directories of a category, with the
//! primary directory winning on name collisions. Writes always target the
//! primary directory. Every mutation checks containment before touching the
//! filesystem.

use crate::category::CategoryResolver;
use crate::error::{Result, RuleHubError};
use crate::files;
use crate::usage::METADATA_DIR;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A listed file and where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Filename
    pub name: String,

    /// Absolute path of the file that wins for this name
    pub path: PathBuf,

    /// True if the file only exists in the legacy directory
    pub legacy: bool,
}

/// Category-aware access to the files of one library root.
#[derive(Debug, Clone)]
pub struct Storage {
    resolver: CategoryResolver,
}

impl Storage {
    pub fn new(resolver: CategoryResolver) -> Self {
        Storage { resolver }
    }

    /// The storage root
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn resolver(&self) -> &CategoryResolver {
        &self.resolver
    }

    /// Swap category definitions after a structural change.
    pub fn set_resolver(&mut self, resolver: CategoryResolver) {
        self.resolver = resolver;
    }

    /// Create the primary directory of every configured category and the
    /// metadata directory. Legacy directories are never created.
    pub fn ensure_directory_structure(&self) -> Result<()> {
        for category in self.resolver.categories() {
            fs::create_dir_all(self.resolver.resolve(&category.key).primary)?;
        }
        fs::create_dir_all(self.root().join(METADATA_DIR))?;
        info!(root = %self.root().display(), "Storage directories ready");
        Ok(())
    }

    /// Path a file of this category would have in the primary directory.
    pub fn resolve_file_path(&self, category: &str, name: &str) -> PathBuf {
        self.resolver.resolve(category).primary.join(name)
    }

    /// Existing path of a file, preferring primary over legacy.
    ///
    /// Falls back to the primary path when the file exists in neither.
    pub fn resolve_file_path_flexible(&self, category: &str, name: &str) -> PathBuf {
        let dirs = self.resolver.resolve(category);
        let primary = dirs.primary.join(name);
        if primary.exists() {
            return primary;
        }
        if let Some(legacy) = dirs.legacy.map(|dir| dir.join(name)) {
            if legacy.exists() {
                return legacy;
            }
        }
        primary
    }

    /// Files of a category: primary listing, then legacy-only names.
    pub fn list_entries(&self, category: &str) -> Vec<FileEntry> {
        let dirs = self.resolver.resolve(category);
        let extensions = self.resolver.allowed_extensions(category);

        let mut seen = HashSet::new();
        let mut entries: Vec<FileEntry> = files::list_files(&dirs.primary, extensions)
            .into_iter()
            .map(|name| {
                seen.insert(name.clone());
                FileEntry {
                    path: dirs.primary.join(&name),
                    name,
                    legacy: false,
                }
            })
            .collect();

        if let Some(legacy_dir) = dirs.legacy {
            for name in files::list_files(&legacy_dir, extensions) {
                if seen.insert(name.clone()) {
                    entries.push(FileEntry {
                        path: legacy_dir.join(&name),
                        name,
                        legacy: true,
                    });
                }
            }
        }

        entries
    }

    /// Deduplicated filenames of a category.
    pub fn list_files(&self, category: &str) -> Vec<String> {
        self.list_entries(category)
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    }

    /// Whether `path` lies inside the storage root.
    pub fn is_managed(&self, path: &Path) -> bool {
        files::is_managed(self.root(), path)
    }

    /// Rewrite a managed path into the form listings produce.
    ///
    /// `..` segments, symlinks into the root and relative spellings all map
    /// to `<root>/<relative>`, which is the key usage records are stored
    /// under.
    pub fn managed_path(&self, path: &Path) -> Result<PathBuf> {
        files::managed_relative(self.root(), path)
            .map(|relative| self.root().join(relative))
            .ok_or_else(|| RuleHubError::NotManaged {
                path: path.to_path_buf(),
            })
    }

    pub fn allowed_extensions(&self, category: &str) -> &[String] {
        self.resolver.allowed_extensions(category)
    }

    /// Append the first allowed extension if `name` matches none.
    pub fn ensure_extension(&self, category: &str, name: &str) -> String {
        let extensions = self.allowed_extensions(category);
        match extensions.first() {
            Some(first) if !files::has_allowed_extension(name, extensions) => {
                format!("{}{}", name, first)
            }
            _ => name.to_string(),
        }
    }

    /// Create a file in the primary directory of `category`.
    pub fn create_file(&self, category: &str, name: &str, content: &[u8]) -> Result<PathBuf> {
        validate_name(name)?;
        let path = self.resolve_file_path(category, name);
        self.ensure_managed(&path)?;

        if path.exists() {
            return Err(RuleHubError::AlreadyExists { path });
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;

        info!(category, name, "Created file");
        Ok(path)
    }

    /// Delete a file of `category`, wherever it currently lives.
    pub fn delete_file(&self, category: &str, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        let path = self.resolve_file_path_flexible(category, name);
        self.ensure_managed(&path)?;

        if !path.is_file() {
            return Err(RuleHubError::FileNotFound { path });
        }
        fs::remove_file(&path)?;

        info!(category, name, "Deleted file");
        Ok(path)
    }

    /// Rename a file within the directory that holds it.
    ///
    /// Returns the old and new absolute paths.
    pub fn rename_file(
        &self,
        category: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        validate_name(old_name)?;
        validate_name(new_name)?;
        let old_path = self.resolve_file_path_flexible(category, old_name);
        let new_path = old_path.with_file_name(new_name);
        self.ensure_managed(&old_path)?;
        self.ensure_managed(&new_path)?;

        if !old_path.is_file() {
            return Err(RuleHubError::FileNotFound { path: old_path });
        }
        if new_path.exists() {
            return Err(RuleHubError::AlreadyExists { path: new_path });
        }
        fs::rename(&old_path, &new_path)?;

        info!(category, old_name, new_name, "Renamed file");
        Ok((old_path, new_path))
    }

    /// Copy starter files from `source_root/<category>` into the library.
    ///
    /// Only enabled categories and allowed extensions are considered.
    /// Existing files are never overwritten. A file that fails to copy is
    /// skipped. Returns the paths that were written.
    pub fn install_starter(&self, source_root: &Path) -> Vec<PathBuf> {
        let mut installed = Vec::new();

        for category in self.resolver.enabled_categories() {
            let source_dir = source_root.join(&category);
            let extensions = self.allowed_extensions(&category);

            for name in files::list_files(&source_dir, extensions) {
                let dest = self.resolve_file_path(&category, &name);
                if dest.exists() {
                    debug!(path = %dest.display(), "Starter file already present");
                    continue;
                }
                match copy_into(&source_dir.join(&name), &dest) {
                    Ok(()) => installed.push(dest),
                    Err(err) => {
                        warn!(category = %category, name = %name, error = %err, "Skipping starter file");
                    }
                }
            }
        }

        info!(files = installed.len(), "Starter install finished");
        installed
    }

    fn ensure_managed(&self, path: &Path) -> Result<()> {
        if self.is_managed(path) {
            Ok(())
        } else {
            Err(RuleHubError::NotManaged {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Size of a file in bytes, 0 if it cannot be read
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn copy_into(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}

/// Reject names that are not a single path component.
fn validate_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(RuleHubError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn make_storage(temp_dir: &TempDir) -> Storage {
        let root = temp_dir.path().join("hub");
        let storage = Storage::new(CategoryResolver::new(&root, &Config::default()));
        storage.ensure_directory_structure().unwrap();
        storage
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_directory_structure() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);

        for key in ["rule", "prompt", "mcp", "agent", "workflow"] {
            assert!(storage.root().join("categories").join(key).is_dir());
        }
        assert!(!storage.root().join("categories/rules").exists());
        assert!(storage.root().join("metadata").is_dir());
    }

    #[test]
    fn test_list_files_merges_legacy() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);
        let root = storage.root().to_path_buf();

        write(&root.join("categories/rule/shared.md"), "primary");
        write(&root.join("categories/rule/new.md"), "");
        write(&root.join("categories/rules/shared.md"), "legacy");
        write(&root.join("categories/rules/old.md"), "");
        write(&root.join("categories/rules/skip.txt"), "");

        assert_eq!(storage.list_files("rule"), vec!["new.md", "shared.md", "old.md"]);

        let entries = storage.list_entries("rule");
        let shared = entries.iter().find(|e| e.name == "shared.md").unwrap();
        assert_eq!(shared.path, root.join("categories/rule/shared.md"));
        assert!(!shared.legacy);
        let old = entries.iter().find(|e| e.name == "old.md").unwrap();
        assert!(old.legacy);
    }

    #[test]
    fn test_resolve_flexible() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);
        let root = storage.root().to_path_buf();

        write(&root.join("categories/prompts/old.md"), "");
        assert_eq!(
            storage.resolve_file_path_flexible("prompt", "old.md"),
            root.join("categories/prompts/old.md")
        );

        write(&root.join("categories/prompt/old.md"), "");
        assert_eq!(
            storage.resolve_file_path_flexible("prompt", "old.md"),
            root.join("categories/prompt/old.md")
        );

        assert_eq!(
            storage.resolve_file_path_flexible("prompt", "missing.md"),
            root.join("categories/prompt/missing.md")
        );
    }

    #[test]
    fn test_create_writes_primary_only() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);

        let path = storage.create_file("workflow", "deploy.md", b"# Deploy").unwrap();
        assert_eq!(path, storage.root().join("categories/workflow/deploy.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Deploy");

        let again = storage.create_file("workflow", "deploy.md", b"");
        assert!(matches!(again, Err(RuleHubError::AlreadyExists { .. })));
    }

    #[test]
    fn test_create_rejects_bad_names() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);

        for name in ["", "..", "../escape.md", "a/b.md", "a\\b.md"] {
            let result = storage.create_file("rule", name, b"");
            assert!(matches!(result, Err(RuleHubError::InvalidName { .. })), "{name}");
        }
    }

    #[test]
    fn test_mutation_outside_root_refused() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);

        // A category key that climbs out of the root
        let result = storage.create_file("../../outside", "x.md", b"");
        assert!(matches!(result, Err(RuleHubError::NotManaged { .. })));
        assert!(!temp_dir.path().join("outside").exists());
    }

    #[test]
    fn test_managed_path_normalizes_dot_dot() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);
        let listed = storage.root().join("categories/rule/a.md");
        fs::write(&listed, "a").unwrap();

        let winding = storage.root().join("categories/prompt/../rule/a.md");
        assert_eq!(storage.managed_path(&winding).unwrap(), listed);

        let escaping = storage.root().join("categories/../../a.md");
        assert!(matches!(
            storage.managed_path(&escaping),
            Err(RuleHubError::NotManaged { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_managed_path_through_symlinked_root() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);
        let listed = storage.root().join("categories/rule/a.md");
        fs::write(&listed, "a").unwrap();

        let link = temp_dir.path().join("hub-link");
        std::os::unix::fs::symlink(storage.root(), &link).unwrap();

        let via_link = link.join("categories/rule/a.md");
        assert_eq!(storage.managed_path(&via_link).unwrap(), listed);
    }

    #[test]
    fn test_delete_and_rename() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);
        let root = storage.root().to_path_buf();
        write(&root.join("categories/rules/legacy.md"), "");
        storage.create_file("rule", "a.md", b"").unwrap();

        let (old, new) = storage.rename_file("rule", "a.md", "b.md").unwrap();
        assert!(!old.exists());
        assert!(new.exists());
        assert_eq!(storage.list_files("rule"), vec!["b.md", "legacy.md"]);

        // Legacy files are renamed where they live
        let (_, moved) = storage.rename_file("rule", "legacy.md", "kept.md").unwrap();
        assert_eq!(moved, root.join("categories/rules/kept.md"));

        let deleted = storage.delete_file("rule", "kept.md").unwrap();
        assert!(!deleted.exists());

        let missing = storage.delete_file("rule", "kept.md");
        assert!(matches!(missing, Err(RuleHubError::FileNotFound { .. })));
    }

    #[test]
    fn test_rename_onto_existing() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);
        storage.create_file("rule", "a.md", b"").unwrap();
        storage.create_file("rule", "b.md", b"").unwrap();

        let result = storage.rename_file("rule", "a.md", "b.md");
        assert!(matches!(result, Err(RuleHubError::AlreadyExists { .. })));
    }

    #[test]
    fn test_ensure_extension() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);

        assert_eq!(storage.ensure_extension("mcp", "server"), "server.json");
        assert_eq!(storage.ensure_extension("mcp", "server.JSON"), "server.JSON");
        assert_eq!(storage.ensure_extension("unknown", "notes"), "notes");
    }

    #[test]
    fn test_install_starter() {
        let temp_dir = TempDir::new().unwrap();
        let storage = make_storage(&temp_dir);
        let starter = temp_dir.path().join("starter");
        write(&starter.join("rule/style.md"), "starter style");
        write(&starter.join("rule/readme.txt"), "");
        write(&starter.join("mcp/servers.json"), "{}");
        write(&storage.root().join("categories/rule/style.md"), "mine");

        let installed = storage.install_starter(&starter);
        assert_eq!(
            installed,
            vec![storage.root().join("categories/mcp/servers.json")]
        );
        // Never overwrite
        assert_eq!(
            fs::read_to_string(storage.root().join("categories/rule/style.md")).unwrap(),
            "mine"
        );
    }
}
