//! Error types for proxy operations

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Error opening socket on port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },

    #[error("Malformed request: {0}")]
    RequestParse(#[from] ParseError),

    #[error("Request headers exceed {limit} bytes")]
    RequestTooLarge { limit: usize },

    #[error("Cannot establish connection to web server {host}:{port}: {source}")]
    UpstreamConnect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[error("Failed to load censor list from {path}: {source}")]
    CensorListLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid censor term {term:?}: {source}")]
    InvalidTerm {
        term: String,
        source: regex::Error,
    },

    #[error("Failed to load config from {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a request head cannot be turned into an upstream target
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty request")]
    EmptyRequest,

    #[error("request line has no target: {line:?}")]
    MissingTarget { line: String },

    #[error("no host in request target {target:?}")]
    EmptyHost { target: String },

    #[error("invalid port {port:?}")]
    InvalidPort { port: String },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("proxy.backlog must be greater than zero")]
    ZeroBacklog,

    #[error("proxy.buffer_size must be greater than zero")]
    ZeroBufferSize,

    #[error("proxy.max_request_bytes ({max_request_bytes}) is smaller than proxy.buffer_size ({buffer_size})")]
    RequestLimitTooSmall {
        max_request_bytes: usize,
        buffer_size: usize,
    },

    #[error("proxy.max_connections must be greater than zero when set")]
    ZeroMaxConnections,

    #[error("proxy.max_connections ({value}) exceeds the limit of {max}")]
    TooManyConnections { value: usize, max: usize },
}
