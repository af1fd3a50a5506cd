//! Backend connection settings.

use std::net::IpAddr;

use crate::error::ConfigError;

pub const URL_VAR: &str = "TODO_BACKEND_URL";
pub const ANON_KEY_VAR: &str = "TODO_BACKEND_ANON_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`; blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let url = read(URL_VAR)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url));
        }
        let anon_key = read(ANON_KEY_VAR)?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }

    /// First label of the backend host (`abcd` for `https://abcd.example.co`),
    /// used to namespace the stored session. Local backends share `local`.
    pub fn project_ref(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);
        let host = rest.split(['/', ':']).next().unwrap_or(rest);
        if host == "localhost" || host.parse::<IpAddr>().is_ok() {
            return "local";
        }
        host.split('.').next().unwrap_or(host)
    }
}
