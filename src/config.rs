use url::Url;

use crate::api::ApiEndpoints;
use crate::error::{Error, Result};

pub const DEFAULT_API_HOST: &str = "localhost";
pub const DEFAULT_API_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: Url,
    /// Volume the narration player starts with, in `0..=1`.
    pub initial_volume: f64,
}

impl Config {
    /// Read `FABULA_API_BASE_URL`, or `FABULA_API_HOST`/`FABULA_API_PORT`
    /// when no full base URL is set, and `FABULA_INITIAL_VOLUME`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base = match non_empty("FABULA_API_BASE_URL") {
            Some(base) => base,
            None => {
                let host =
                    non_empty("FABULA_API_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_string());
                let port = match non_empty("FABULA_API_PORT") {
                    Some(port) => port
                        .trim()
                        .parse::<u16>()
                        .map_err(|_| Error::InvalidPort(port.clone()))?,
                    None => DEFAULT_API_PORT,
                };
                format!("http://{}:{}", host, port)
            }
        };

        let api_base_url = Url::parse(base.trim()).map_err(|source| Error::InvalidUrl {
            value: base.clone(),
            source,
        })?;
        if api_base_url.cannot_be_a_base() {
            return Err(Error::CannotBeABase(base));
        }

        let initial_volume = match non_empty("FABULA_INITIAL_VOLUME") {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(volume) if (0.0..=1.0).contains(&volume) => volume,
                _ => return Err(Error::InvalidVolume(raw)),
            },
            None => 1.0,
        };

        if api_base_url.scheme() != "http" && api_base_url.scheme() != "https" {
            log::warn!("API base URL uses unusual scheme {}", api_base_url.scheme());
        }

        Ok(Self {
            api_base_url,
            initial_volume,
        })
    }

    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints::new(self.api_base_url.clone())
    }
}
