use super::handler::{Completion, ConnectionHandler};
use crate::censor::WordList;
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn, Instrument};

/// Censoring proxy server configuration
#[derive(Clone)]
pub struct ProxyServerConfig {
    /// TCP port to listen on, on all interfaces; 0 picks a free port
    pub port: u16,
    /// Listener and relay settings
    pub proxy: Arc<ProxyConfig>,
    /// Redaction terms shared by every connection
    pub words: Arc<WordList>,
}

/// Censoring HTTP forward proxy
pub struct ProxyServer {
    config: ProxyServerConfig,
    listener: TcpListener,
    connection_limit: Option<Arc<Semaphore>>,
}

impl ProxyServer {
    /// Bind the listening socket
    ///
    /// The socket is closed again if any step after creating it fails.
    pub async fn bind(config: ProxyServerConfig) -> Result<Self> {
        let port = config.port;
        let bind_error = |source| ProxyError::Bind { port, source };

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let socket = TcpSocket::new_v4().map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;
        let listener = socket.listen(config.proxy.backlog).map_err(bind_error)?;

        info!(
            "Proxy server listening on {} (backlog {})",
            listener.local_addr().map_err(bind_error)?,
            config.proxy.backlog
        );

        let connection_limit = config
            .proxy
            .max_connections
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Ok(Self {
            config,
            listener,
            connection_limit,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one task per connection
    pub async fn run(self) -> Result<()> {
        loop {
            // Wait for a free slot before accepting so excess clients queue
            // in the listen backlog.
            let permit = match &self.connection_limit {
                Some(limit) => match Arc::clone(limit).acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return Ok(()),
                },
                None => None,
            };

            let (socket, peer_addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };
            debug!("Client connected: {}", peer_addr);

            let mut handler =
                ConnectionHandler::new(Arc::clone(&self.config.proxy), Arc::clone(&self.config.words));
            let span = tracing::info_span!("connection", peer = %peer_addr);

            // Spawn a task for each connection
            tokio::spawn(
                async move {
                    match handler.handle(socket).await {
                        Ok(Completion::Relayed { target, response_bytes }) => {
                            debug!("Connection to {} closed after {} bytes", target, response_bytes);
                        }
                        Ok(Completion::ClientClosed) => {}
                        Err(e) => warn!("{}", e),
                    }
                    drop(permit);
                }
                .instrument(span),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(port: u16) -> ProxyServerConfig {
        ProxyServerConfig {
            port,
            proxy: Arc::new(ProxyConfig::default()),
            words: Arc::new(WordList::empty()),
        }
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = ProxyServer::bind(test_config(0)).await.unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_port_in_use() {
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        match ProxyServer::bind(test_config(port)).await {
            Err(ProxyError::Bind { port: p, .. }) => assert_eq!(p, port),
            Err(other) => panic!("Expected Bind error, got {other:?}"),
            Ok(_) => panic!("Expected Bind error, got a listener"),
        }
    }
}
