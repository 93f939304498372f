//! Configuration for the nlq binary
//!
//! Loads configuration from:
//! 1. config.yaml - translator, schema and logging settings
//! 2. .env file / process environment - overrides
//!
//! Environment variables always override config.yaml values. Command-line
//! flags are applied last, in `main`.

use nlq::{ResolverKind, TranslateOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::query::TargetMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Translation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Output target: "sql" or "pipeline"
    pub target: TargetMode,

    /// Column matching strategy: "substring" or "token"
    pub resolver: ResolverKind,

    pub strict_aggregate_refs: bool,

    pub parameterize_literals: bool,
}

impl TranslatorConfig {
    pub fn options(&self) -> TranslateOptions {
        TranslateOptions {
            resolver: self.resolver,
            strict_aggregate_refs: self.strict_aggregate_refs,
            parameterize_literals: self.parameterize_literals,
        }
    }
}

/// Where the schema comes from and which of its tables are loaded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Schema file (YAML or JSON)
    pub path: Option<String>,

    /// Loaded tables; empty means every table in the file
    pub tables: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stderr, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn,nlq=info".to_string(),
            format: "pretty".to_string(),
            output: "stderr".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub translator: TranslatorConfig,
    pub schema: SchemaConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a config file
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if std::env::var("NLQ_TARGET").is_ok() {
            self.translator.target = TargetMode::from_env();
        }
        if let Ok(resolver) = std::env::var("NLQ_RESOLVER") {
            self.translator.resolver = resolver
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "NLQ_RESOLVER",
                    value: resolver.clone(),
                })?;
        }
        if let Some(strict) = env_flag("NLQ_STRICT_AGGREGATES")? {
            self.translator.strict_aggregate_refs = strict;
        }
        if let Some(parameterize) = env_flag("NLQ_PARAMETERIZE")? {
            self.translator.parameterize_literals = parameterize;
        }

        if let Ok(path) = std::env::var("NLQ_SCHEMA_PATH") {
            self.schema.path = Some(path);
        }
        if let Ok(tables) = std::env::var("NLQ_TABLES") {
            self.schema.tables = split_list(&tables);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }

        Ok(())
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}

/// Comma-separated names, trimmed, empties dropped
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_flag(var: &'static str) -> Result<Option<bool>, ConfigError> {
    let Ok(value) = std::env::var(var) else {
        return Ok(None);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue { var, value }),
    }
}
