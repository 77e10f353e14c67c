// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! Persisted configuration schema.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_max_connections() -> usize {
    8
}

fn default_timeout() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
        .to_string()
}

fn default_theme() -> String {
    "quantum".to_string()
}

/// Persisted, layered configuration. Loaded from `~/.fluxion/config.json`,
/// overlaid by `./fluxion.json`, overlaid by `FLUXION_<KEY>` environment
/// variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluxionConfig {
    #[serde(default)]
    pub default_output_dir: Option<PathBuf>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_timeout")]
    pub default_timeout: f64,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_true")]
    pub enable_http3: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub default_browser_profile: Option<String>,
    #[serde(default)]
    pub plugin_dirs: Vec<PathBuf>,
}

impl Default for FluxionConfig {
    fn default() -> Self {
        Self {
            default_output_dir: None,
            max_connections: default_max_connections(),
            default_timeout: default_timeout(),
            verify_tls: true,
            proxy: None,
            user_agent: default_user_agent(),
            enable_http3: true,
            theme: default_theme(),
            default_browser_profile: None,
            plugin_dirs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let config = FluxionConfig::default();
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.default_timeout, 30.0);
        assert!(config.verify_tls);
        assert_eq!(config.theme, "quantum");
        assert!(config.enable_http3);
        assert!(config.plugin_dirs.is_empty());
    }

    #[test]
    fn unknown_keys_in_file_are_ignored_not_rejected() {
        let json = r#"{"max_connections": 16, "some_future_key": "ignored"}"#;
        let config: FluxionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_connections, 16);
    }
}
