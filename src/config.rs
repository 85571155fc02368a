use std::num::NonZeroUsize;

use anyhow::{anyhow, bail, Context};

const ENV_HOST: &str = "HOST";
const ENV_PORT: &str = "PORT";
const ENV_USERNAME: &str = "USERNAME";
const ENV_PASSWORD: &str = "PASSWORD";
const ENV_VDOM_NAME: &str = "VDOM_NAME";
const ENV_MAC_GROUP_NAME: &str = "MAC_GROUP_NAME";
const ENV_MAX_GROUP_SIZE: &str = "MAX_GROUP_SIZE";

const DEFAULT_PORT: u16 = 22;
const DEFAULT_GROUP_NAME: &str = "Default-Group";
const DEFAULT_MAX_GROUP_SIZE: usize = 256;

/// How the generated address objects are bundled into address groups.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct GroupSettings {
    pub(crate) prefix: String,
    pub(crate) max_size: NonZeroUsize,
}

/// Connection parameters of the target appliance.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct ConnectionSettings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) username: String,
    pub(crate) password: String,
    /// Virtual domain to enter before `config global`. Empty disables it.
    pub(crate) vdom: String,
}

impl GroupSettings {
    pub(crate) fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(env_lookup)
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = lookup(ENV_MAC_GROUP_NAME).unwrap_or_else(|| DEFAULT_GROUP_NAME.to_string());

        let max_size = match lookup(ENV_MAX_GROUP_SIZE) {
            None => NonZeroUsize::new(DEFAULT_MAX_GROUP_SIZE)
                .ok_or_else(|| anyhow!("Invalid default group size"))?,
            Some(value) => value
                .trim()
                .parse::<NonZeroUsize>()
                .with_context(|| format!("{ENV_MAX_GROUP_SIZE} must be a positive integer, got '{value}'"))?,
        };

        Ok(GroupSettings { prefix, max_size })
    }
}

impl ConnectionSettings {
    pub(crate) fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(env_lookup)
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| match lookup(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(anyhow!("{key} is not set")),
        };

        let host = required(ENV_HOST)?;
        let username = required(ENV_USERNAME)?;
        let password = required(ENV_PASSWORD)?;

        let port = match lookup(ENV_PORT) {
            None => DEFAULT_PORT,
            Some(value) => value
                .trim()
                .parse::<u16>()
                .with_context(|| format!("{ENV_PORT} must be a valid port number, got '{value}'"))?,
        };
        if port == 0 {
            bail!("{ENV_PORT} must not be 0");
        }

        Ok(ConnectionSettings {
            host,
            port,
            username,
            password,
            vdom: lookup(ENV_VDOM_NAME).unwrap_or_default(),
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
