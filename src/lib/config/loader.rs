use super::app::AppConfig;
use super::credentials::Credentials;
use super::error::ConfigError;
use super::settings::{
    MetricsSettings, PersonaDescriptor, PollSettings, ServerSettings, StorageSettings,
    WorkerSettings,
};
use crate::constants::{CONFIG_PATH, ENV_PATH};
use dotenvy::from_filename;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Raw settings structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub(super) struct RawConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub polling: PollSettings,
    pub metrics: MetricsSettings,
    pub worker: WorkerSettings,
    pub personas: Vec<PersonaDescriptor>,
}

/// Ensures environment variables are loaded from config/.env and ./.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
        let _ = dotenvy::dotenv();
    });
}

/// Load settings and credentials, validating both.
///
/// A missing file at the default path means built-in defaults; a missing
/// file at an explicit path is an error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    let raw = match path {
        Some(path) => read_settings(path)?,
        None => match read_settings(Path::new(CONFIG_PATH)) {
            Err(ConfigError::NotFound { path }) => {
                debug!(path = %path.display(), "Settings file absent, using defaults");
                RawConfig::default()
            }
            other => other?,
        },
    };
    let credentials = Credentials::from_env()?;
    AppConfig::from_raw(raw, credentials)
}

/// Parse settings text and combine it with already-resolved credentials.
pub fn parse_config(content: &str, credentials: Credentials) -> Result<AppConfig, ConfigError> {
    let raw = parse_settings(content, Path::new("<inline>"))?;
    AppConfig::from_raw(raw, credentials)
}

fn read_settings(path: &Path) -> Result<RawConfig, ConfigError> {
    debug!(path = %path.display(), "Reading server settings file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_settings(&content, path)
}

fn parse_settings(content: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
