use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Error, ErrorKind, Result};
use std::path::Path;

/// Protocol timing knobs.
/// All values are in milliseconds unless otherwise specified.
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    /// Silence window before a probed name counts as unique (ms, default: 2000)
    #[serde(default = "default_probe_window")]
    pub probe_window_ms: u64,
    /// Interval between repeated browse queries (ms, default: 60000)
    #[serde(default = "default_browse_interval")]
    pub browse_interval_ms: u64,
    /// Random spread added to cache refresh triggers (ms, default: 20)
    #[serde(default = "default_cache_jitter")]
    pub cache_jitter_ms: u64,
    /// Timeout for one-shot address lookups (ms, default: 2000)
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            probe_window_ms: default_probe_window(),
            browse_interval_ms: default_browse_interval(),
            cache_jitter_ms: default_cache_jitter(),
            lookup_timeout_ms: default_lookup_timeout(),
        }
    }
}

fn default_probe_window() -> u64 {
    2000
}
fn default_browse_interval() -> u64 {
    60_000
}
fn default_cache_jitter() -> u64 {
    20
}
fn default_lookup_timeout() -> u64 {
    2000
}

/// One service to publish.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Instance name, e.g. "My Web Server"
    pub name: String,
    /// Service type, e.g. "_http._tcp.local."
    #[serde(rename = "type")]
    pub service_type: String,
    pub port: u16,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Top-level runtime configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RuntimeConfig {
    /// Interface address for outgoing IPv4 multicast ("0.0.0.0" = any)
    #[serde(default)]
    pub interface: Option<String>,
    /// Addresses answered for this host's A/AAAA queries
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Service types to browse for
    #[serde(default)]
    pub browse: Vec<String>,
    /// Services to publish
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl RuntimeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| Error::new(ErrorKind::InvalidData, e))
    }
}
