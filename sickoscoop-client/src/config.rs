use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "SICKOSCOOP_";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_NOTICE_TTL_SECS: u64 = 5;
pub const DEFAULT_STORAGE_PATH: &str = "sickoscoop-session.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

/// Client settings, read from `SICKOSCOOP_*` environment variables.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_notice_ttl_secs() -> u64 {
    DEFAULT_NOTICE_TTL_SECS
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_PATH)
}

impl Default for Env {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            notice_ttl_secs: DEFAULT_NOTICE_TTL_SECS,
            storage_path: default_storage_path(),
        }
    }
}

impl Env {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::NotPositive("REQUEST_TIMEOUT_SECS"));
        }
        if self.notice_ttl_secs == 0 {
            return Err(ConfigError::NotPositive("NOTICE_TTL_SECS"));
        }
        Ok(self)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }
}

pub fn get_env() -> Result<Env, ConfigError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    from_iter(std::env::vars())
}

pub fn from_iter<Iter>(vars: Iter) -> Result<Env, ConfigError>
where
    Iter: IntoIterator<Item = (String, String)>,
{
    let env: Env = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
    env.validate()
}
