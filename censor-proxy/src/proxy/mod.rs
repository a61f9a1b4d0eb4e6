//! Listener, connection handling and upstream relay

pub mod handler;
pub mod request;
pub mod server;
pub mod upstream;

pub use handler::{Completion, ConnectionHandler, ConnectionState, BAD_GATEWAY_BODY};
pub use request::{RequestLine, UpstreamTarget};
pub use server::{ProxyServer, ProxyServerConfig};
