//! HTTP forward proxy that redacts listed words from textual responses

pub mod censor;
pub mod config;
pub mod error;
pub mod proxy;

// Re-export commonly used types
pub use censor::{ResponseCensor, WordList};
pub use config::{Config, ConfigLoader, ProxyConfig};
pub use error::{ParseError, ProxyError, Result, ValidationError};
pub use proxy::{ConnectionHandler, ProxyServer, ProxyServerConfig, UpstreamTarget};
