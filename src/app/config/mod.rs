use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

pub mod user;

pub use user::UserConfig;

pub struct AppConfig;

impl AppConfig {
    pub fn get_config_dir() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let xdg_dir = home.join(".config").join("swara");

        // Ensure it exists
        if !xdg_dir.exists() {
            let _ = fs::create_dir_all(&xdg_dir);
        }

        xdg_dir
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_session_path() -> PathBuf {
        Self::get_config_dir().join("session.json")
    }

    pub fn get_log_dir() -> PathBuf {
        Self::get_config_dir().join("logs")
    }

    pub fn load() -> UserConfig {
        Self::load_from(&Self::get_config_path())
    }

    /// Read `path`, or write the defaults there when it is missing. A file
    /// that does not parse falls back to defaults and is left alone.
    pub fn load_from(path: &Path) -> UserConfig {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                    warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                    UserConfig::default()
                }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot read config, using defaults");
                    UserConfig::default()
                }
            }
        } else {
            // Create default config.toml if missing
            let c = UserConfig::default();
            if let Ok(content) = toml::to_string_pretty(&c) {
                let _ = fs::write(path, content);
            }
            c
        }
    }

    /// Defaults as TOML, for `--generate-config`.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&UserConfig::default()).unwrap_or_default()
    }
}
