//! Runtime configuration read from the environment.
//!
//! | Variable   | Default   |
//! |------------|-----------|
//! | `TSU_HOST` | `0.0.0.0` |
//! | `TSU_PORT` | `3000`    |

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::ConfigError;

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 3000;

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// Reads `TSU_HOST` / `TSU_PORT`, falling back to the defaults above.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host: IpAddr = match lookup("TSU_HOST") {
            Some(value) => value.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidEnv { key: "TSU_HOST", value, reason: e.to_string() }
            })?,
            None => DEFAULT_HOST,
        };

        let port = match lookup("TSU_PORT") {
            Some(value) => value.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnv { key: "TSU_PORT", value, reason: e.to_string() }
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self { addr: SocketAddr::new(host, port) })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: SocketAddr::new(DEFAULT_HOST, DEFAULT_PORT) }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr.to_string(), format!("{DEFAULT_HOST}:{DEFAULT_PORT}"));
    }

    #[test]
    fn reads_host_and_port() {
        let config =
            ServerConfig::from_lookup(lookup(&[("TSU_HOST", "127.0.0.1"), ("TSU_PORT", "8081")]))
                .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8081".parse().unwrap());
    }

    #[test]
    fn rejects_bad_port() {
        let err = ServerConfig::from_lookup(lookup(&[("TSU_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "TSU_PORT", .. }));
    }
}
