//! Configuration file support for crossref-search.
//!
//! # Configuration File Format
//!
//! ```toml
//! [crossref]
//! base_url = "https://api.crossref.org"
//! mailto = "you@example.org"
//! timeout_seconds = 10
//!
//! [search]
//! results_per_page = 10
//! sort_by = "relevance"
//!
//! [history]
//! enabled = true
//! max_entries = 20
//!
//! [logging]
//! level = "info"
//! ```

use std::fs;
use std::path::Path;

use super::Config;

impl Config {
    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::build_config;
    use crate::models::SortBy;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_saved_config_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.crossref.mailto = "me@example.org".to_string();
        config.search.sort_by = SortBy::Newest;
        config.save(&path).unwrap();

        let loaded = build_config(Some(&path), Some(HashMap::new())).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let result = Config::default().save(&blocker.join("config.toml"));
        assert!(matches!(result, Err(ConfigFileError::Io(_))));
    }
}
