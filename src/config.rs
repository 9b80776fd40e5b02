use crate::error::ConfigError;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_ENV: &str = "MEMORABLE_MOMENTS_CONFIG";
const APP_DIR: &str = "memorable-moments";

/// A login accepted by the local auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    /// Hex SHA-256 digest of the password.
    pub password_sha256: String,
    /// Partition key for this user's entries and images.
    pub uid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub flip_delay_ms: u64,
    /// Terminals narrower than this show one page at a time.
    pub narrow_width: u16,
    /// Page units covered by one terminal cell.
    pub cell_width: i32,
    pub cell_height: i32,
    /// Digest of the password asked for before uploads, image deletes and
    /// tag saves. No digest means no prompt.
    pub action_password_sha256: Option<String>,
    pub tag_suggest_url: Option<String>,
    pub accounts: Vec<Account>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            flip_delay_ms: 900,
            narrow_width: 100,
            cell_width: 10,
            cell_height: 20,
            action_password_sha256: None,
            tag_suggest_url: None,
            accounts: Vec::new(),
        }
    }
}

impl Config {
    /// Loads the config file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load() -> Self {
        let path = match config_path() {
            Ok(path) => path,
            Err(err) => {
                error!("{}. Using default config.", err);
                return Config::default();
            }
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                error!(
                    "Failed to load {}: {}. Using default config.",
                    path.display(),
                    err
                );
                Config::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn flip_delay(&self) -> Duration {
        Duration::from_millis(self.flip_delay_ms)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("diary.log")
    }
}

fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.flip_delay_ms, 900);
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
flip_delay_ms = 300
tag_suggest_url = "http://localhost:3400/suggest"

[[accounts]]
email = "me@example.com"
password_sha256 = "abc"
uid = "u1"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.flip_delay(), Duration::from_millis(300));
        assert_eq!(config.narrow_width, 100);
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].uid, "u1");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "flip_delay_ms = \"soon\"").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
