//! Outbound connections to origin servers

use super::request::UpstreamTarget;
use crate::error::{ProxyError, Result};
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Open a TCP connection to the origin server
///
/// DNS failures, refusals and an expired `timeout` all come back as
/// [`ProxyError::UpstreamConnect`]; nothing here outlives the caller's
/// connection.
pub async fn connect(target: &UpstreamTarget, timeout: Option<Duration>) -> Result<TcpStream> {
    debug!("Attempting to connect to {}", target);

    let dial = TcpStream::connect((target.host.as_str(), target.port));
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, dial).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no connection after {:?}", limit),
            )),
        },
        None => dial.await,
    };

    let stream = result.map_err(|e| ProxyError::UpstreamConnect {
        host: target.host.clone(),
        port: target.port,
        source: e,
    })?;

    debug!("Connection succeeded to {}", target);
    Ok(stream)
}
