//! Configuration management for proxy

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::ConfigLoader;
pub use schema::{CensorConfig, Config, ProxyConfig};
pub use validator::ConfigValidator;
