pub mod app;
pub mod credentials;
pub mod defaults;
pub mod error;
pub mod loader;
pub mod settings;

pub use crate::constants::{CONFIG_PATH, ENV_PATH};
pub use app::AppConfig;
pub use credentials::{BotCredentials, Credentials, WorkerEndpoint};
pub use error::ConfigError;
pub use loader::{ensure_env_loaded, load_config, parse_config};
pub use settings::{
    MetricsSettings, PersonaDescriptor, PollSettings, ServerSettings, StorageSettings,
    WorkerSettings,
};
