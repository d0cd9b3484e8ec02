use super::error::ConfigError;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};

pub const WORKER_URL: &str = "WORKER_URL";
pub const WORKER_TOKEN: &str = "WORKER_TOKEN";
pub const RENDERER_URL: &str = "RENDERER_URL";
pub const RENDERER_TOKEN: &str = "RENDERER_TOKEN";
pub const STORAGE_CONNECTION_STRING: &str = "STORAGE_CONNECTION_STRING";
pub const STORAGE_CONTAINER: &str = "STORAGE_CONTAINER";
pub const BOT_CLIENT_ID: &str = "BOT_CLIENT_ID";
pub const BOT_CLIENT_SECRET: &str = "BOT_CLIENT_SECRET";

/// Base URL plus bearer credential of an external worker.
#[derive(Debug)]
pub struct WorkerEndpoint {
    pub url: Url,
    pub token: SecretString,
}

impl WorkerEndpoint {
    pub fn token(&self) -> SecretString {
        SecretString::from(self.token.expose_secret().to_owned())
    }
}

/// Credentials of the conversational agent collaborator. Validated at
/// startup only; nothing in this process authenticates with them.
#[derive(Debug)]
pub struct BotCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Everything sourced from the process environment.
#[derive(Debug)]
pub struct Credentials {
    pub worker: WorkerEndpoint,
    pub renderer: WorkerEndpoint,
    pub storage_connection_string: SecretString,
    pub storage_container: String,
    pub bot: BotCredentials,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` is the production source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let worker = WorkerEndpoint {
            url: parse_url(WORKER_URL, &required(&lookup, WORKER_URL)?)?,
            token: SecretString::from(required(&lookup, WORKER_TOKEN)?),
        };

        let renderer_url = match optional(&lookup, RENDERER_URL)? {
            Some(raw) => parse_url(RENDERER_URL, &raw)?,
            None => worker.url.clone(),
        };
        let renderer_token = match optional(&lookup, RENDERER_TOKEN)? {
            Some(token) => SecretString::from(token),
            None => worker.token(),
        };

        let storage_container = required(&lookup, STORAGE_CONTAINER)?;
        validate_container(&storage_container)?;

        Ok(Self {
            worker,
            renderer: WorkerEndpoint {
                url: renderer_url,
                token: renderer_token,
            },
            storage_connection_string: SecretString::from(required(
                &lookup,
                STORAGE_CONNECTION_STRING,
            )?),
            storage_container,
            bot: BotCredentials {
                client_id: required(&lookup, BOT_CLIENT_ID)?,
                client_secret: SecretString::from(required(&lookup, BOT_CLIENT_SECRET)?),
            },
        })
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, var)?.ok_or(ConfigError::MissingEnv { var })
}

fn optional<F>(lookup: &F, var: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if is_placeholder(value) {
        return Err(ConfigError::PlaceholderEnv { var });
    }
    Ok(Some(value.to_string()))
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("your_") && lower.ends_with("_here")
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|err| ConfigError::InvalidEnv {
        var,
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnv {
            var,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

// Blob container naming: 3-63 chars, lowercase letters, digits and single dashes.
fn validate_container(name: &str) -> Result<(), ConfigError> {
    let valid = (3..=63).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnv {
            var: STORAGE_CONTAINER,
            reason: format!("'{name}' is not a valid container name"),
        })
    }
}
