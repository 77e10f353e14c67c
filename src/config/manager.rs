// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

//! # Configuration Manager
//!
//! A layered configuration manager using figment: a global file, a local
//! file, and environment variables, merged in that order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::models::FluxionConfig;
use crate::error::{FluxionError, Result};

/// Configuration manager with figment-based layered loading.
#[derive(Debug)]
pub struct ConfigManager {
    config: Arc<RwLock<FluxionConfig>>,
    config_paths: Vec<PathBuf>,
}

/// Configuration events for monitoring changes.
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    Loaded,
    Reloaded,
    ValidationFailed(String),
}

impl ConfigManager {
    /// Create a new configuration manager, discovering config files in
    /// the standard locations.
    pub async fn new() -> Result<Self> {
        let config_paths = Self::discover_config_files();
        let config = Self::load_config(&config_paths).await?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_paths,
        })
    }

    /// Create a configuration manager from one specific file.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = Self::load_config(std::slice::from_ref(&path)).await?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_paths: vec![path],
        })
    }

    pub async fn get_config(&self) -> FluxionConfig {
        self.config.read().await.clone()
    }

    pub async fn get_config_arc(&self) -> Arc<FluxionConfig> {
        Arc::new(self.config.read().await.clone())
    }

    /// Reload configuration from the same sources.
    pub async fn reload(&self) -> Result<()> {
        let new_config = Self::load_config(&self.config_paths).await?;
        *self.config.write().await = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// The global file, then the local project file, in overlay order.
    fn discover_config_files() -> Vec<PathBuf> {
        let mut files = Vec::new();

        if let Some(home) = dirs::home_dir() {
            let global = home.join(".fluxion").join("config.json");
            if global.exists() {
                files.push(global);
            }
        }

        let local = PathBuf::from("fluxion.json");
        if local.exists() {
            files.push(local);
        }

        files
    }

    /// Load configuration from the global file, the local file, and
    /// `FLUXION_`-prefixed environment variables, in that order.
    async fn load_config(paths: &[PathBuf]) -> Result<FluxionConfig> {
        let mut figment = Figment::from(figment::providers::Serialized::defaults(FluxionConfig::default()));

        for path in paths {
            if path.exists() {
                debug!("Loading configuration from: {}", path.display());
                figment = figment.merge(Json::file(path));
            } else {
                warn!("Configuration file not found: {}", path.display());
            }
        }

        figment = figment.merge(Env::prefixed("FLUXION_"));

        let config: FluxionConfig = figment
            .extract()
            .map_err(|e| FluxionError::config(format!("Failed to load configuration: {e}")))?;

        Self::validate_config(&config)?;

        info!("Configuration loaded successfully from {} file(s)", paths.len());
        Ok(config)
    }

    fn validate_config(config: &FluxionConfig) -> Result<()> {
        if config.max_connections == 0 {
            return Err(FluxionError::config("max_connections must be greater than 0"));
        }
        if config.default_timeout <= 0.0 {
            return Err(FluxionError::config("default_timeout must be positive"));
        }
        if config.user_agent.is_empty() {
            return Err(FluxionError::config("user_agent cannot be empty"));
        }
        Ok(())
    }

    pub fn get_sources(&self) -> &[PathBuf] {
        &self.config_paths
    }
}

/// Fluent builder for [`ConfigManager`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_file: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub async fn build(self) -> Result<ConfigManager> {
        match self.config_file {
            Some(config_file) => ConfigManager::from_file(config_file).await,
            None => ConfigManager::new().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn loads_defaults_with_no_files_present() {
        let config = ConfigManager::load_config(&[]).await.unwrap();
        assert_eq!(config.max_connections, 8);
    }

    #[tokio::test]
    async fn file_values_overlay_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fluxion.json");
        let mut file = tokio::fs::File::create(&path).await.unwrap();
        file.write_all(br#"{"max_connections": 16, "theme": "mono"}"#).await.unwrap();
        file.flush().await.unwrap();

        let config = ConfigManager::load_config(&[path]).await.unwrap();
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.theme, "mono");
        assert!(config.verify_tls);
    }

    #[tokio::test]
    async fn rejects_non_positive_timeout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fluxion.json");
        let mut file = tokio::fs::File::create(&path).await.unwrap();
        file.write_all(br#"{"default_timeout": 0}"#).await.unwrap();
        file.flush().await.unwrap();

        let err = ConfigManager::load_config(&[path]).await.unwrap_err();
        assert_eq!(err.category(), "config");
    }
}
