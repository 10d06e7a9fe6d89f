//! Persisted hub connection settings.
//!
//! The three Maker API secrets live in a single pretty-printed JSON file,
//! `config.json`, under a configurable base directory. All I/O here is
//! fail-soft: a missing or malformed file loads as `None`, and save/clear
//! report success as a bool rather than raising.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Environment variable overriding the default config directory.
pub const CONFIG_HOME_ENV: &str = "HUBITATD_CONFIG_HOME";

const CONFIG_FILE_NAME: &str = "config.json";

/// Connection settings for one hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// IP address or hostname of the hub.
    #[serde(default)]
    pub hub_address: String,

    /// Maker API application id.
    #[serde(default)]
    pub maker_api_id: String,

    /// Maker API access token.
    #[serde(default)]
    pub access_token: String,
}

impl HubConfig {
    /// All three fields must be non-empty before a client may be built.
    pub fn is_complete(&self) -> bool {
        !self.hub_address.is_empty()
            && !self.maker_api_id.is_empty()
            && !self.access_token.is_empty()
    }
}

/// Loads, saves, and clears the config file.
pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let config_file = config_dir.join(CONFIG_FILE_NAME);
        Self {
            config_dir,
            config_file,
        }
    }

    /// Store rooted at `$HUBITATD_CONFIG_HOME`, or the working directory when
    /// unset.
    pub fn from_env() -> Self {
        let dir = std::env::var(CONFIG_HOME_ENV).unwrap_or_else(|_| ".".to_string());
        Self::new(dir)
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Load the persisted config, or `None` when the file is absent,
    /// unreadable, or malformed. Fields missing from the JSON come back as
    /// empty strings.
    pub fn load(&self) -> Option<HubConfig> {
        if !self.config_file.exists() {
            warn!("configuration file does not exist");
            return None;
        }

        let contents = match std::fs::read_to_string(&self.config_file) {
            Ok(contents) => contents,
            Err(e) => {
                error!("failed to read configuration: {e}");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                error!("failed to parse configuration: {e}");
                None
            }
        }
    }

    /// Write the config as pretty-printed JSON, creating the directory if
    /// needed.
    pub fn save(&self, config: &HubConfig) -> bool {
        if let Err(e) = std::fs::create_dir_all(&self.config_dir) {
            error!("failed to create config directory: {e}");
            return false;
        }

        let json = match serde_json::to_string_pretty(config) {
            Ok(json) => json,
            Err(e) => {
                error!("failed to serialize configuration: {e}");
                return false;
            }
        };

        match std::fs::write(&self.config_file, json) {
            Ok(()) => {
                info!("configuration saved");
                true
            }
            Err(e) => {
                error!("failed to save configuration: {e}");
                false
            }
        }
    }

    /// Remove the config file. True when it is gone afterwards, including the
    /// case where it never existed.
    pub fn clear(&self) -> bool {
        if !self.config_file.exists() {
            return true;
        }

        match std::fs::remove_file(&self.config_file) {
            Ok(()) => {
                info!("configuration cleared");
                true
            }
            Err(e) => {
                error!("failed to clear configuration: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> HubConfig {
        HubConfig {
            hub_address: "192.168.1.20".to_string(),
            maker_api_id: "77".to_string(),
            access_token: "secret-token".to_string(),
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());

        let config = sample_config();
        assert!(store.save(&config));
        assert_eq!(store.load(), Some(config));
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested/config"));
        assert!(store.save(&sample_config()));
        assert!(store.load().is_some());
    }

    #[test]
    fn test_load_absent_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_load_malformed_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        std::fs::write(store.config_file(), "not json at all").unwrap();
        assert_eq!(store.load(), None);

        std::fs::write(store.config_file(), "[1, 2, 3]").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_load_defaults_missing_fields_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        std::fs::write(store.config_file(), r#"{"hub_address": "hub.local"}"#).unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.hub_address, "hub.local");
        assert_eq!(config.maker_api_id, "");
        assert_eq!(config.access_token, "");
        assert!(!config.is_complete());
    }

    #[test]
    fn test_clear_is_true_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        assert!(store.clear());

        assert!(store.save(&sample_config()));
        assert!(store.clear());
        assert_eq!(store.load(), None);
    }
}
