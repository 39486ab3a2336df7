//! Persisted config (index location, Ollama models, etc.) in the app data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::ollama::{DEFAULT_BASE_URL, DEFAULT_EMBED_MODEL, DEFAULT_GENERATE_MODEL};
use crate::record::EmbedField;

const CONFIG_FILENAME: &str = "config.toml";

/// Default number of rows sent to the embedding model per request.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// All fields are optional in the file; accessors apply defaults.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Shared prefix of the persisted index artifacts.
    pub index_prefix: Option<String>,
    pub ollama_url: Option<String>,
    pub embed_model: Option<String>,
    pub generate_model: Option<String>,
    /// Which verse field is embedded at build time.
    pub embed_field: Option<EmbedField>,
    pub batch_size: Option<usize>,
}

impl Config {
    /// Configured index prefix, else `<app data>/index/bhagavatam`.
    pub fn index_prefix(&self) -> Option<PathBuf> {
        self.index_prefix
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .or_else(app_data::default_index_prefix)
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn embed_model(&self) -> &str {
        self.embed_model.as_deref().unwrap_or(DEFAULT_EMBED_MODEL)
    }

    pub fn generate_model(&self) -> &str {
        self.generate_model.as_deref().unwrap_or(DEFAULT_GENERATE_MODEL)
    }

    pub fn embed_field(&self) -> EmbedField {
        self.embed_field.unwrap_or_default()
    }

    /// Batch size, never below 1.
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1)
    }
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(data_dir) = app_data::app_data_dir() else {
        return Config::default();
    };
    load_config_from(&data_dir.join(CONFIG_FILENAME))
}

/// Load config from an explicit file. Returns default config if missing or invalid.
pub fn load_config_from(path: &Path) -> Config {
    let Ok(s) = std::fs::read_to_string(path) else {
        return Config::default();
    };
    match toml::from_str(&s) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config");
            Config::default()
        }
    }
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let data_dir = app_data::app_data_dir().ok_or(ConfigError::NoDataDir)?;
    save_config_to(config, &data_dir.join(CONFIG_FILENAME))
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(path, s).map_err(ConfigError::Write)
}

/// Set and persist the index prefix.
pub fn set_index_prefix(prefix: &Path) -> Result<(), ConfigError> {
    let mut config = load_config();
    config.index_prefix = Some(prefix.to_string_lossy().into_owned());
    save_config(&config)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let c = Config::default();
        assert_eq!(c.ollama_url(), DEFAULT_BASE_URL);
        assert_eq!(c.embed_field(), EmbedField::Sanskrit);
        assert_eq!(c.batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let c = Config {
            batch_size: Some(0),
            ..Config::default()
        };
        assert_eq!(c.batch_size(), 1);
    }

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let c = Config {
            index_prefix: Some("/tmp/idx/sb".into()),
            embed_field: Some(EmbedField::Translation),
            batch_size: Some(8),
            ..Config::default()
        };
        save_config_to(&c, &path).unwrap();
        assert_eq!(load_config_from(&path), c);
        assert_eq!(c.index_prefix(), Some(PathBuf::from("/tmp/idx/sb")));
    }

    #[test]
    fn invalid_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "batch_size = \"lots\"").unwrap();
        assert_eq!(load_config_from(&path), Config::default());
        assert_eq!(load_config_from(&dir.path().join("missing.toml")), Config::default());
    }
}
