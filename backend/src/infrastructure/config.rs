use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::application::presence::DuplicatePolicy;
use crate::domain::KeySpace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

/// Process settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub redis_host: String,
    pub redis_port: u16,
    pub presence_prefix: String,
    pub challenge_prefix: String,
    pub duplicate_policy: DuplicatePolicy,
    pub challenge_ttl_secs: Option<u64>,
    pub store_backend: StoreBackend,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env(Environment::default())
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("redis_host", "127.0.0.1")?
            .set_default("redis_port", 6379)?
            .set_default("presence_prefix", "presence:")?
            .set_default("challenge_prefix", "challenge:")?
            .set_default("duplicate_policy", "refresh")?
            .set_default("store_backend", "redis")?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize::<Self>()?
            .validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.presence_prefix.is_empty() {
            return Err(ConfigError::Message("PRESENCE_PREFIX must not be empty".into()));
        }
        // An empty challenge prefix selects bare legacy keys; the relay guards those.
        if !self.challenge_prefix.is_empty()
            && (self.challenge_prefix.starts_with(&self.presence_prefix)
                || self.presence_prefix.starts_with(&self.challenge_prefix))
        {
            return Err(ConfigError::Message(format!(
                "CHALLENGE_PREFIX {:?} overlaps PRESENCE_PREFIX {:?}",
                self.challenge_prefix, self.presence_prefix
            )));
        }
        if self.challenge_ttl_secs == Some(0) {
            return Err(ConfigError::Message(
                "CHALLENGE_TTL_SECS must be greater than zero; leave it unset to disable expiry".into(),
            ));
        }
        Ok(self)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }

    pub fn key_space(&self) -> KeySpace {
        KeySpace::new(self.presence_prefix.clone(), self.challenge_prefix.clone())
    }
}
