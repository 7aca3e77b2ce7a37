use crate::constants::{CONFIG_PATHS, DEFAULT_CORPUS_NAME, DEFAULT_TEXT_HEADER};
use crate::utils;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration loaded from settings.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// How loaded tables are turned into a corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_text_header")]
    pub text_header: String,
    /// Corpus column joined against `meta_link`
    #[serde(default)]
    pub corpus_link: Option<String>,
    /// Metadata column joined against `corpus_link`
    #[serde(default)]
    pub meta_link: Option<String>,
}

fn default_text_header() -> String {
    DEFAULT_TEXT_HEADER.to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            text_header: default_text_header(),
            corpus_link: None,
            meta_link: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_name")]
    pub default_name: String,
}

fn default_corpus_name() -> String {
    DEFAULT_CORPUS_NAME.to_string()
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            default_name: default_corpus_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_preview_rows() -> usize {
    5
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            preview_rows: default_preview_rows(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from default location or return defaults
    pub fn load() -> Result<Self> {
        for path in CONFIG_PATHS.iter().map(|p| utils::expand_path(p)) {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }
}
