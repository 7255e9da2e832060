use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;

/// User-editable configuration (read-only after load)
/// stored in `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Directory holding the view templates. Relative paths are taken from
    /// the working directory.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,
    /// How long a view waits for its templates.
    #[serde(default = "default_template_timeout_ms")]
    pub template_timeout_ms: u64,
    #[serde(default = "default_volume")]
    pub default_volume: f64,
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_template_timeout_ms() -> u64 {
    5000
}

fn default_volume() -> f64 {
    0.5
}

fn default_toast_duration_ms() -> u64 {
    3000
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            templates_dir: default_templates_dir(),
            template_timeout_ms: default_template_timeout_ms(),
            default_volume: default_volume(),
            toast_duration_ms: default_toast_duration_ms(),
        }
    }
}

impl UserConfig {
    /// Command line flags win over the file.
    pub fn with_overrides(mut self, api: Option<&str>, templates: Option<&str>) -> Self {
        if let Some(api) = api {
            self.api_base_url = api.to_string();
        }
        if let Some(templates) = templates {
            self.templates_dir = templates.to_string();
        }
        self
    }
}
