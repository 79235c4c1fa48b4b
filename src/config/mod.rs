pub mod settings;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::ignore::{DEFAULT_IGNORE_DIRS, DEFAULT_IGNORE_EXTENSIONS};
use crate::core::{IgnoreRules, DEFAULT_RESULT_LIMIT, MAX_RESULT_LIMIT};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Opened on startup when it still exists.
    pub default_root: Option<PathBuf>,
    pub output_directory: PathBuf,
    /// File stem of the generated artifact; `.txt` is appended.
    pub output_name: String,
    pub ignore_dirs: BTreeSet<String>,
    pub ignore_extensions: BTreeSet<String>,
    /// Extra `.gitignore`-style globs on top of the name rules.
    pub ignore_patterns: BTreeSet<String>,
    pub search_result_limit: usize,
}

impl AppConfig {
    /// The configured default root, if it is still a directory on disk.
    pub fn valid_default_root(&self) -> Option<&Path> {
        self.default_root
            .as_deref()
            .filter(|root| root.is_dir())
    }

    pub fn ignore_rules(&self) -> IgnoreRules {
        IgnoreRules::new(
            &self.ignore_dirs,
            &self.ignore_extensions,
            &self.ignore_patterns,
        )
    }

    pub fn output_file(&self) -> PathBuf {
        let name = self.output_name.trim();
        let name = if name.is_empty() { "contexto" } else { name };
        self.output_directory.join(format!("{name}.txt"))
    }

    pub fn result_limit(&self) -> usize {
        self.search_result_limit.clamp(1, MAX_RESULT_LIMIT)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_root: None,
            output_directory: dirs::home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("context_tree"),
            output_name: "contexto".to_string(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect(),
            ignore_extensions: DEFAULT_IGNORE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            ignore_patterns: BTreeSet::new(),
            search_result_limit: DEFAULT_RESULT_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_root_must_still_exist() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig {
            default_root: Some(dir.path().to_path_buf()),
            ..AppConfig::default()
        };
        assert_eq!(config.valid_default_root(), Some(dir.path()));

        config.default_root = Some(dir.path().join("missing"));
        assert_eq!(config.valid_default_root(), None);

        config.default_root = None;
        assert_eq!(config.valid_default_root(), None);
    }

    #[test]
    fn test_output_file_appends_txt() {
        let config = AppConfig {
            output_directory: PathBuf::from("/out"),
            output_name: " notes ".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.output_file(), PathBuf::from("/out/notes.txt"));

        let blank = AppConfig {
            output_name: String::new(),
            ..config
        };
        assert_eq!(blank.output_file(), PathBuf::from("/out/contexto.txt"));
    }

    #[test]
    fn test_result_limit_is_clamped() {
        let mut config = AppConfig::default();
        assert_eq!(config.result_limit(), 40);
        config.search_result_limit = 0;
        assert_eq!(config.result_limit(), 1);
        config.search_result_limit = 999;
        assert_eq!(config.result_limit(), 50);
    }

    #[test]
    fn test_ignore_rules_follow_config() {
        let mut config = AppConfig::default();
        config.ignore_dirs.insert("vendor".to_string());
        config.ignore_extensions.remove(".png");
        let rules = config.ignore_rules();

        assert!(rules.should_ignore(Path::new("vendor"), true));
        assert!(!rules.should_ignore(Path::new("logo.png"), false));
        assert!(rules.should_ignore(Path::new("logo.jpg"), false));
    }
}
