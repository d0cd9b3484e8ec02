use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration.
///
/// Every variant is fatal: the process refuses to serve with partial config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required environment variable '{var}'")]
    MissingEnv { var: &'static str },

    #[error("environment variable '{var}' still holds a placeholder value")]
    PlaceholderEnv { var: &'static str },

    #[error("environment variable '{var}' is invalid: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error("setting '{field}' is invalid: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}
