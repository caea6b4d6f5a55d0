//! Layered CLI configuration: built-in defaults, then a TOML file (either
//! the one passed via `--config` or `~/.config/loomwork/config.toml` if
//! present), then environment variables prefixed `LOOMWORK_`.

use std::path::Path;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_format: LogFormat,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { log_format: LogFormat::Human, log_level: "info".to_string() }
    }
}

impl AppConfig {
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        let config_path = explicit_path.map(Path::to_path_buf).or_else(default_config_path);
        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("LOOMWORK_"));
        Ok(figment.extract()?)
    }
}

fn default_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("loomwork").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_no_files_falls_back_to_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/loomwork-cli-test.toml"))).unwrap();
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.log_level, "info");
    }
}
