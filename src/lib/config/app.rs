use super::credentials::Credentials;
use super::error::ConfigError;
use super::loader::RawConfig;
use super::settings::{
    MetricsSettings, PersonaDescriptor, PollSettings, ServerSettings, StorageSettings,
    WorkerSettings,
};
use std::net::SocketAddr;
use std::path::Path;

/// Immutable process configuration, loaded once at startup and shared by
/// reference with every component.
#[derive(Debug)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub polling: PollSettings,
    pub metrics: MetricsSettings,
    pub worker: WorkerSettings,
    pub personas: Vec<PersonaDescriptor>,
    pub credentials: Credentials,
}

impl AppConfig {
    /// Load settings from a file path (or default path if None) and
    /// credentials from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    pub(super) fn from_raw(raw: RawConfig, credentials: Credentials) -> Result<Self, ConfigError> {
        let config = Self {
            server: raw.server,
            storage: raw.storage,
            polling: raw.polling,
            metrics: raw.metrics,
            worker: raw.worker,
            personas: raw.personas,
            credentials,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::InvalidSetting {
                field: "server.bind",
                reason: err.to_string(),
            })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.polling.max_attempts == 0 {
            return Err(invalid("polling.max_attempts", "must be at least 1"));
        }
        if self.polling.max_delay_ms < self.polling.base_delay_ms {
            return Err(invalid(
                "polling.max_delay_ms",
                "must not be smaller than polling.base_delay_ms",
            ));
        }
        if self.metrics.window_capacity == 0 {
            return Err(invalid("metrics.window_capacity", "must be at least 1"));
        }
        if !self.storage.public_prefix.starts_with('/') {
            return Err(invalid("storage.public_prefix", "must start with '/'"));
        }
        if self.worker.max_result_bytes == 0 {
            return Err(invalid("worker.max_result_bytes", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        field,
        reason: reason.to_string(),
    }
}
