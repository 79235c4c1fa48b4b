use anyhow::Result;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use super::AppConfig;

const APP_NAME: &str = "ContextTree";
const CONFIG_FILE: &str = "config.json";
const EXCLUSIONS_FILE: &str = "exclusions.json";

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("com", "contexttree", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the configuration file.
pub fn get_config_file_path() -> Option<PathBuf> {
    get_config_directory().map(|dir| dir.join(CONFIG_FILE))
}

/// Returns the path of the persisted exclusion list, next to the config file.
pub fn get_exclusion_store_path(config_dir: Option<&Path>) -> Option<PathBuf> {
    config_dir
        .map(Path::to_path_buf)
        .or_else(get_config_directory)
        .map(|dir| dir.join(EXCLUSIONS_FILE))
}

fn resolve_config_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => get_config_file_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory")),
    }
}

/// Loads the application configuration from `path`, or the default location.
///
/// A missing file is created with defaults. A file that cannot be parsed logs a
/// warning and yields the defaults without being overwritten.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = resolve_config_path(path)?;

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = AppConfig::default();
        save_config(&default_config, Some(&config_path))?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)?;

    match serde_json::from_str::<AppConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Falling back to default config.",
                config_path,
                e
            );
            Ok(AppConfig::default())
        }
    }
}

/// Saves the provided configuration to `path`, or the default location.
pub fn save_config(config: &AppConfig, path: Option<&Path>) -> Result<()> {
    let config_path = resolve_config_path(path)?;

    if let Some(config_dir) = config_path.parent() {
        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
    }

    let mut config_json = serde_json::to_string_pretty(config)?;
    config_json.push('\n');
    fs::write(&config_path, config_json)?;
    tracing::info!("Saved config to {:?}", config_path);

    Ok(())
}

// Platform-specific configuration paths for reference:
// macOS:   ~/Library/Application Support/com.contexttree.ContextTree/
// Linux:   ~/.config/contexttree/
// Windows: %APPDATA%/contexttree/ContextTree/config/

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.json");

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig {
            default_root: Some(PathBuf::from("/work/project")),
            output_name: "bundle".to_string(),
            search_result_limit: 25,
            ..AppConfig::default()
        };

        save_config(&config, Some(&path)).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_partial_document_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "default_root": "/srv/app" }"#).unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.default_root, Some(PathBuf::from("/srv/app")));
        assert_eq!(config.output_name, "contexto");
        assert!(config.ignore_dirs.contains("node_modules"));
    }

    #[test]
    fn test_corrupt_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config, AppConfig::default());
        // The broken file is left for the user to inspect.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_exclusion_store_sits_in_config_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(
            get_exclusion_store_path(Some(dir.path())),
            Some(dir.path().join("exclusions.json"))
        );
    }
}
