//! # Application Configuration
//!
//! This module defines the configuration structure for the `invoice-parser-server`
//! and the logic for loading it from an optional `config.yml` file and environment
//! variables.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    #[error("Configuration error: {0}")]
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    #[error("{0}")]
    NotFound(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Parent directory for per-request scratch directories.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Lowercase file extensions accepted for upload.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Report failed extraction calls as a per-result `error` instead of empty data.
    #[serde(default)]
    pub strict_extraction: bool,
    /// Optional deadline for a whole batch, in seconds.
    #[serde(default)]
    pub batch_timeout_secs: Option<u64>,

    #[serde(default)]
    pub credentials: CredentialsConfig,
    pub document_ai: DocumentAiConfig,
}

fn default_port() -> u16 {
    5000
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    ["pdf", "png", "jpg", "jpeg"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

/// Where the service-account key lives and how tokens are requested.
#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,
    /// Defaults to the cloud-platform scope.
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_true")]
    pub cache_tokens: bool,
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: i64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            key_path: default_key_path(),
            scope: None,
            cache_tokens: true,
            refresh_margin_secs: default_refresh_margin_secs(),
        }
    }
}

fn default_key_path() -> PathBuf {
    PathBuf::from("/etc/secrets/googleKey.json")
}

fn default_true() -> bool {
    true
}

fn default_refresh_margin_secs() -> i64 {
    60
}

/// The Document AI processor to call.
#[derive(Debug, Deserialize, Clone)]
pub struct DocumentAiConfig {
    pub project_id: String,
    #[serde(default = "default_location")]
    pub location: String,
    pub processor_id: String,
    /// Overrides the regional endpoint; mainly for tests and proxies.
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_location() -> String {
    "us".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

// Reads a file and substitutes `${VAR}` references with environment values.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// Layers, lowest precedence first:
/// - serde defaults on `AppConfig`;
/// - `config.yml` in the crate directory, or `config_path_override` (which must exist);
/// - top-level environment variables such as `PORT`;
/// - `INVOICE_PARSER_...` variables for nested keys
///   (e.g., `INVOICE_PARSER_DOCUMENT_AI__PROCESSOR_ID`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    let config_path = match config_path_override {
        Some(path) => path.to_string(),
        None => format!("{}/config.yml", env!("CARGO_MANIFEST_DIR")),
    };

    match read_and_substitute(&config_path)? {
        Some(content) => {
            info!("Loading configuration from '{config_path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None if config_path_override.is_some() => {
            return Err(ConfigError::NotFound(format!(
                "Config file not found at '{config_path}'."
            )));
        }
        None => info!("'{config_path}' not found. Using defaults and environment only."),
    }

    let settings = builder
        .add_source(Environment::default())
        .add_source(
            Environment::with_prefix("INVOICE_PARSER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("allowed_extensions"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;
    for ext in config.allowed_extensions.iter_mut() {
        *ext = ext.trim_start_matches('.').to_ascii_lowercase();
    }

    Ok(config)
}
