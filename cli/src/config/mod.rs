use azpager_client::builder::ClientConfig;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

pub mod setup;

pub use setup::{CONFIG_FILE_NAME, get_config_dir, get_config_file_path};

/// Prefix of environment overrides, e.g. `AZPAGER__CLIENT__ENDPOINT`
pub const ENV_PREFIX: &str = "AZPAGER";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error(
        "Configuration loading failed: {0}. Please check your azpager.toml file and environment variables."
    )]
    Load(String),
    #[error("Failed to deserialize config: {0}")]
    Deserialize(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    client: ClientConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl AppConfig {
    pub fn client(&self) -> &ClientConfig {
        &self.client
    }

    pub fn into_client(self) -> ClientConfig {
        self.client
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Command-line values win over every configuration source.
    pub fn apply_overrides(&mut self, endpoint: Option<String>, api_version: Option<String>) {
        if let Some(endpoint) = endpoint {
            self.client = std::mem::take(&mut self.client).with_endpoint(endpoint);
        }
        if let Some(api_version) = api_version {
            self.client = std::mem::take(&mut self.client).with_api_version(api_version);
        }
    }

    /// Collects every problem as a user-facing message.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors: Vec<String> = match self.client.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.user_message()).collect(),
        };

        if let Some(level) = &self.logging.level {
            if !LoggingConfig::LEVELS.contains(&level.to_lowercase().as_str()) {
                errors.push(format!(
                    "Unknown log level '{level}'. Use one of: {}",
                    LoggingConfig::LEVELS.join(", ")
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    level: Option<String>,
    file: Option<String>,
}

impl LoggingConfig {
    const LEVELS: [&'static str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("warn")
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref().filter(|file| !file.trim().is_empty())
    }
}

/// Loads configuration from, in increasing priority: the user config file,
/// `azpager.toml` in the working directory (or `explicit` when given) and
/// `AZPAGER__*` environment variables. A `.env` file is honored.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigLoadError> {
    dotenv::dotenv().ok();

    let mut builder = Config::builder();

    if let Ok(user_file) = get_config_file_path() {
        builder = builder.add_source(File::from(user_file).required(false));
    }

    builder = match explicit {
        Some(path) => builder.add_source(File::from(path).required(true)),
        None => builder.add_source(File::with_name(CONFIG_FILE_NAME).required(false)),
    };

    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigLoadError::Load(e.to_string()))?;

    config
        .try_deserialize::<AppConfig>()
        .map_err(|e| ConfigLoadError::Deserialize(e.to_string()))
}
