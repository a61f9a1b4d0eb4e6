//! Per-connection request handling
//!
//! One [`ConnectionHandler`] owns one client stream and at most one upstream
//! stream. Both are dropped, and therefore closed, when [`ConnectionHandler::handle`]
//! returns, whichever way it returns.

use super::request::{self, UpstreamTarget};
use super::upstream;
use crate::censor::{ResponseCensor, WordList};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Body sent to the client when the origin server cannot be reached
pub const BAD_GATEWAY_BODY: &str = "<h1>502 Bad Gateway</h1>\n";

/// Lifecycle of a single proxied connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    ReceivingRequest,
    Parsing,
    DialingUpstream,
    Relaying,
    Closed,
}

/// How a connection finished when nothing went wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The client disconnected without sending a request
    ClientClosed,
    /// The response was relayed until the origin closed its side
    Relayed {
        target: UpstreamTarget,
        response_bytes: u64,
    },
}

/// Drives one client connection through request, dial and relay
pub struct ConnectionHandler {
    config: Arc<ProxyConfig>,
    words: Arc<WordList>,
    state: ConnectionState,
}

impl ConnectionHandler {
    pub fn new(config: Arc<ProxyConfig>, words: Arc<WordList>) -> Self {
        Self {
            config,
            words,
            state: ConnectionState::ReceivingRequest,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!("Connection state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Serve one request/response exchange, then close the client
    ///
    /// Errors are scoped to this connection. Where the client can still be
    /// told something (bad request, unreachable origin) a response is written
    /// before the error is returned.
    pub async fn handle<S>(&mut self, mut client: S) -> Result<Completion>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.run(&mut client).await;
        self.transition(ConnectionState::Closed);
        let _ = client.shutdown().await;
        result
    }

    async fn run<S>(&mut self, client: &mut S) -> Result<Completion>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.transition(ConnectionState::ReceivingRequest);
        let request = match self.read_request(client).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("No data received from client");
                return Ok(Completion::ClientClosed);
            }
            Err(e @ ProxyError::RequestTooLarge { .. }) => {
                let _ = send_error_response(client, 431, "Request Header Fields Too Large").await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        debug!("Received {} request bytes from client", request.len());

        self.transition(ConnectionState::Parsing);
        let (line, target) = match request::resolve(&request) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = send_error_response(client, 400, "Bad Request").await;
                return Err(e.into());
            }
        };
        info!("Request {}", line);

        self.transition(ConnectionState::DialingUpstream);
        let mut upstream = match upstream::connect(&target, self.config.connect_timeout()).await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = send_bad_gateway(client).await;
                return Err(e);
            }
        };

        self.transition(ConnectionState::Relaying);
        let response_bytes = self.relay(client, &mut upstream, &request).await?;
        debug!("Relayed {} response bytes from {}", response_bytes, target);

        Ok(Completion::Relayed {
            target,
            response_bytes,
        })
    }

    /// Read the request head in bounded chunks
    ///
    /// Stops at the blank line ending the headers or when the client
    /// half-closes. Returns `None` if the client sent nothing at all.
    async fn read_request<S>(&self, client: &mut S) -> Result<Option<Vec<u8>>>
    where
        S: AsyncRead + Unpin,
    {
        let mut request = Vec::new();
        let mut buf = vec![0u8; self.config.buffer_size];

        loop {
            let n = read_with_timeout(client, &mut buf, self.config.read_timeout()).await?;
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);

            if has_header_terminator(&request) {
                break;
            }
            if request.len() >= self.config.max_request_bytes {
                return Err(ProxyError::RequestTooLarge {
                    limit: self.config.max_request_bytes,
                });
            }
        }

        Ok((!request.is_empty()).then_some(request))
    }

    /// Send the request upstream verbatim, then stream the censored response
    /// back until the origin closes
    async fn relay<S>(&self, client: &mut S, upstream: &mut TcpStream, request: &[u8]) -> Result<u64>
    where
        S: AsyncWrite + Unpin,
    {
        upstream.write_all(request).await?;
        upstream.flush().await?;

        let mut censor = ResponseCensor::new(&self.words);
        let mut buf = vec![0u8; self.config.buffer_size];
        let mut forwarded = 0u64;

        loop {
            let n = read_with_timeout(upstream, &mut buf, self.config.read_timeout()).await?;
            if n == 0 {
                break;
            }

            let out = censor.process(&buf[..n]);
            client.write_all(&out).await?;
            forwarded += out.len() as u64;
        }

        let tail = censor.finish();
        if !tail.is_empty() {
            client.write_all(&tail).await?;
            forwarded += tail.len() as u64;
        }
        client.flush().await?;

        Ok(forwarded)
    }
}

fn has_header_terminator(request: &[u8]) -> bool {
    request.windows(4).any(|w| w == b"\r\n\r\n") || request.windows(2).any(|w| w == b"\n\n")
}

async fn read_with_timeout<R>(reader: &mut R, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, reader.read(buf))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, format!("no data after {:?}", limit)))?,
        None => reader.read(buf).await,
    }
}

/// Send an HTTP error response with an empty body
async fn send_error_response<S>(stream: &mut S, status: u16, message: &str) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let response = format!("HTTP/1.0 {status} {message}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

/// Tell the client the origin server could not be reached
async fn send_bad_gateway<S>(stream: &mut S) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let response = format!(
        "HTTP/1.0 502 Bad Gateway\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        BAD_GATEWAY_BODY.len(),
        BAD_GATEWAY_BODY
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}
