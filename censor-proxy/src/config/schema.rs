//! Configuration schema types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete proxy configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub censor: CensorConfig,
}

/// Listener and relay settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Pending-connection queue length passed to listen(2)
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Size of each client and upstream read
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Upper bound on request head bytes read before giving up
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
    /// Seconds to wait for the upstream dial; 0 waits forever
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds to wait on any single client or upstream read; 0 waits forever
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Concurrent connection limit; unbounded when unset
    #[serde(default)]
    pub max_connections: Option<usize>,
}

fn default_backlog() -> u32 {
    40
}

fn default_buffer_size() -> usize {
    1024
}

fn default_max_request_bytes() -> usize {
    16 * 1024
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    60
}

impl ProxyConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.read_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backlog: default_backlog(),
            buffer_size: default_buffer_size(),
            max_request_bytes: default_max_request_bytes(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            max_connections: None,
        }
    }
}

/// Redaction settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CensorConfig {
    /// Word list file, one term per line
    #[serde(default = "default_word_list")]
    pub word_list: PathBuf,
}

fn default_word_list() -> PathBuf {
    PathBuf::from("censor.txt")
}

impl Default for CensorConfig {
    fn default() -> Self {
        Self {
            word_list: default_word_list(),
        }
    }
}
