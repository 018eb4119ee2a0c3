use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use super::HclGrammar;

const JSON_SUFFIX: &str = ".tf.json";

/// Lists the configuration files of a single module directory.
pub struct FileWalker {
    grammar: HclGrammar,
}

impl FileWalker {
    pub fn new() -> Self {
        Self { grammar: HclGrammar }
    }

    /// Native and JSON configuration files directly inside `root`, sorted by
    /// path. Subdirectories are child modules and are not entered. Ignore
    /// files are not consulted: Terraform loads every `.tf` file regardless.
    pub fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let walker = WalkBuilder::new(root)
            .max_depth(Some(1))
            .standard_filters(false)
            .hidden(true)
            .build();

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && (self.is_supported(path) || self.is_json(path)) {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => tracing::debug!("Skipping entry under {}: {}", root.display(), e),
            }
        }

        files.sort();
        files
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        if is_editor_artifact(path) {
            return false;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.grammar.file_extensions().contains(&ext))
    }

    /// JSON-syntax configuration, which is recognised but not loaded.
    pub fn is_json(&self, path: &Path) -> bool {
        !is_editor_artifact(path) && file_name(path).is_some_and(|name| name.ends_with(JSON_SUFFIX))
    }
}

impl Default for FileWalker {
    fn default() -> Self {
        Self::new()
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

// Emacs autosave (#main.tf#) and backup (main.tf~) files.
fn is_editor_artifact(path: &Path) -> bool {
    file_name(path).is_some_and(|name| name.starts_with('#') || name.ends_with('~') || name.ends_with('#'))
}
