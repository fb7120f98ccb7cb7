use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::server::Strategy;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_PATH_VAR: &str = "HELLOBENCH_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub strategy: Strategy,
    /// Simulated downstream latency in milliseconds.
    pub delay_ms: u64,
    /// Worker count for the thread-pool strategy.
    pub threads: usize,
    /// Upper bound on the single request chunk read per connection.
    pub read_buffer: usize,
    pub events_capacity: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            strategy: Strategy::EventLoop,
            delay_ms: 200,
            threads: 10,
            read_buffer: 1024,
            events_capacity: 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then the YAML file named by `HELLOBENCH_CONFIG`, then
    /// individual environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Overlays values found through `lookup` (normally the process
    /// environment) on top of `self`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        override_parsed(&lookup, "PORT", &mut self.port)?;
        override_parsed(&lookup, "STRATEGY", &mut self.strategy)?;
        override_parsed(&lookup, "DELAY_MS", &mut self.delay_ms)?;
        override_parsed(&lookup, "THREADS", &mut self.threads)?;
        override_parsed(&lookup, "READ_BUFFER", &mut self.read_buffer)?;
        override_parsed(&lookup, "EVENTS_CAPACITY", &mut self.events_capacity)?;
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolves [`Config::listen_addr`] to the first matching socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = self.listen_addr();
        addr.to_socket_addrs()
            .with_context(|| format!("invalid listen address {addr}"))?
            .next()
            .with_context(|| format!("listen address {addr} resolved to nothing"))
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key} value {raw:?}: {e}"))?;
    }
    Ok(())
}
