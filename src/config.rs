//! Replay engine configuration
//!
//! JSON file, every field optional:
//!
//! ```json
//! {
//!   "domain_name": "music",
//!   "verbose_progress": false,
//!   "log_level": "info",
//!   "executor_thread_name": "tlreplay-executor",
//!   "document_types": ["music"]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{Logger, Severity};
use crate::replay::DocumentTypeRepo;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings for one replay session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEngineConfig {
    /// Domain reported in progress events
    #[serde(default = "default_domain_name")]
    pub domain_name: String,

    /// Report progress for every entry instead of every interval
    #[serde(default)]
    pub verbose_progress: bool,

    /// Minimum log severity: trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Name of the replay worker thread
    #[serde(default = "default_executor_thread_name")]
    pub executor_thread_name: String,

    /// Document types the feed accepts; empty accepts every type
    #[serde(default)]
    pub document_types: Vec<String>,
}

fn default_domain_name() -> String {
    "default".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_executor_thread_name() -> String {
    "tlreplay-executor".to_string()
}

impl Default for ReplayEngineConfig {
    fn default() -> Self {
        Self {
            domain_name: default_domain_name(),
            verbose_progress: false,
            log_level: default_log_level(),
            executor_thread_name: default_executor_thread_name(),
            document_types: Vec::new(),
        }
    }
}

impl ReplayEngineConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: ReplayEngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.domain_name.trim().is_empty() {
            return Err(ConfigError::Invalid("domain_name must not be empty".into()));
        }
        if self.executor_thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "executor_thread_name must not be empty".into(),
            ));
        }
        self.severity()?;
        if self.document_types.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "document_types must not contain blank names".into(),
            ));
        }
        Ok(())
    }

    /// The configured log level
    pub fn severity(&self) -> ConfigResult<Severity> {
        match Severity::parse(&self.log_level) {
            Some(Severity::Fatal) | None => Err(ConfigError::Invalid(format!(
                "Invalid log_level: '{}'. Must be one of trace, debug, info, warn, error.",
                self.log_level
            ))),
            Some(severity) => Ok(severity),
        }
    }

    /// Set the process-wide minimum log severity
    pub fn apply_log_level(&self) -> ConfigResult<()> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }

    /// Document type registry described by `document_types`
    pub fn document_type_repo(&self) -> DocumentTypeRepo {
        if self.document_types.is_empty() {
            DocumentTypeRepo::permissive()
        } else {
            DocumentTypeRepo::with_types(self.document_types.iter().cloned())
        }
    }
}
