//! Runtime configuration for core services.
//!
//! # Responsibility
//! - Provide defaults for the scheduler and logging.
//! - Resolve overrides from `DOCFLOW_*` environment variables.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - Logging is disabled unless a log directory is configured.

use crate::logging::{default_log_level, normalize_level, LoggingConfig};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Absolute directory for rolling log files.
pub const ENV_LOG_DIR: &str = "DOCFLOW_LOG_DIR";
/// Log level (`trace|debug|info|warn|error`).
pub const ENV_LOG_LEVEL: &str = "DOCFLOW_LOG_LEVEL";
/// Name of the scheduler worker thread.
pub const ENV_SCHEDULER_THREAD: &str = "DOCFLOW_SCHEDULER_THREAD";

const DEFAULT_WORKER_THREAD_NAME: &str = "docflow-scheduler";
/// Reason recorded on transfers executed by the scheduler.
pub const SCHEDULED_TRANSFER_REASON: &str = "scheduled transfer";

/// Deferred scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub worker_thread_name: String,
    pub scheduled_reason: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
            scheduled_reason: SCHEDULED_TRANSFER_REASON.to_string(),
        }
    }
}

/// Top-level configuration consumed by entry points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreConfig {
    /// `None` keeps the `log` facade silent.
    pub logging: Option<LoggingConfig>,
    pub scheduler: SchedulerConfig,
}

impl CoreConfig {
    /// Builds configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let logging = match read(ENV_LOG_DIR) {
            Some(dir) => {
                let log_dir = PathBuf::from(&dir);
                if !log_dir.is_absolute() {
                    return Err(ConfigError::RelativeLogDir(dir));
                }
                let level = match read(ENV_LOG_LEVEL) {
                    Some(raw) => normalize_level(&raw)
                        .map_err(|_| ConfigError::InvalidLevel(raw))?
                        .to_string(),
                    None => default_log_level().to_string(),
                };
                Some(LoggingConfig { level, log_dir })
            }
            None => None,
        };

        let mut scheduler = SchedulerConfig::default();
        if let Some(name) = read(ENV_SCHEDULER_THREAD) {
            scheduler.worker_thread_name = name;
        }

        Ok(Self { logging, scheduler })
    }
}

/// Configuration resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    RelativeLogDir(String),
    InvalidLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RelativeLogDir(value) => {
                write!(f, "{ENV_LOG_DIR} must be an absolute path, got `{value}`")
            }
            Self::InvalidLevel(value) => write!(
                f,
                "{ENV_LOG_LEVEL} must be trace|debug|info|warn|error, got `{value}`"
            ),
        }
    }
}

impl Error for ConfigError {}
