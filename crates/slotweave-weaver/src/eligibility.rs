//! Eligibility list: which modules the weaver processes.
//!
//! The list is a plain text file with one module name per line. Names are
//! trimmed, blank lines are ignored and matching is case-insensitive.

use crate::error::WeaveError;
use rustc_hash::FxHashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Set of module names eligible for weaving
#[derive(Debug, Clone, Default)]
pub struct EligibilityList {
    names: FxHashSet<String>,
}

impl EligibilityList {
    /// Load the list from `path`.
    ///
    /// A missing file is created (along with its parent directories) holding
    /// just `default_module`. The list returned in that case is empty: a
    /// fresh file only takes effect from the next run.
    pub fn load(path: &Path, default_module: &str) -> Result<Self, WeaveError> {
        let io_err = |source| WeaveError::Eligibility {
            path: path.to_path_buf(),
            source,
        };

        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(io_err)?;
                }
            }
            fs::write(path, format!("{}\n", default_module)).map_err(io_err)?;
            info!(path = %path.display(), "created eligibility list");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(io_err)?;
        let list = Self::parse(&content);
        debug!(path = %path.display(), modules = list.len(), "loaded eligibility list");
        Ok(list)
    }

    /// Parse list contents
    pub fn parse(content: &str) -> Self {
        Self::from_names(content.lines())
    }

    /// Build a list from names directly
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    /// Whether `module_name` is on the list
    pub fn contains(&self, module_name: &str) -> bool {
        self.names.contains(&module_name.trim().to_lowercase())
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_trims_and_skips_blanks() {
        let list = EligibilityList::parse("  Application  \n\n\tGame.Core\r\n   \n");
        assert_eq!(list.len(), 2);
        assert!(list.contains("Application"));
        assert!(list.contains("Game.Core"));
        assert!(!list.contains(""));
    }

    #[test]
    fn test_case_insensitive() {
        let list = EligibilityList::from_names(["Application"]);
        assert!(list.contains("application"));
        assert!(list.contains("APPLICATION"));
        assert!(!list.contains("Applications"));
    }

    #[test]
    fn test_missing_file_is_created_and_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Weaver").join("WeaverModules.txt");

        let list = EligibilityList::load(&path, "Application").unwrap();
        assert!(list.is_empty());
        assert!(!list.contains("Application"));

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.trim(), "Application");

        let reloaded = EligibilityList::load(&path, "Application").unwrap();
        assert!(reloaded.contains("application"));
    }

    #[test]
    fn test_existing_file_is_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("modules.txt");
        fs::write(&path, "Gameplay\nUi\n").unwrap();

        let list = EligibilityList::load(&path, "Application").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains("ui"));
        assert!(!list.contains("Application"));
    }

    #[test]
    fn test_unreadable_path_is_fatal() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be cannot be read as text.
        let path = dir.path().join("modules.txt");
        fs::create_dir(&path).unwrap();

        let result = EligibilityList::load(&path, "Application");
        assert!(matches!(result, Err(WeaveError::Eligibility { .. })));
    }
}
