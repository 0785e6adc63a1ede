use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_ANALYTICS_RETAIN: usize = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Built assets: `widget.js` and the loader wasm at the top level, the
    /// trunk output of the widget under `widget/`.
    pub static_dir: PathBuf,
    pub analytics_retain: usize,
}

impl Config {
    /// Reads `BIND_ADDR`, `STATIC_DIR` and `ANALYTICS_RETAIN`. Call after
    /// `dotenvy::dotenv()` so `.env` values apply.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = parse_var(&lookup, "BIND_ADDR", "socket address")?
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));
        let static_dir = lookup("STATIC_DIR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
            .into();
        let analytics_retain = parse_var(&lookup, "ANALYTICS_RETAIN", "event count")?
            .unwrap_or(DEFAULT_ANALYTICS_RETAIN);
        Ok(Self {
            bind_addr,
            static_dir,
            analytics_retain,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var,
                expected,
                value,
            }),
    }
}
