//! Request line parsing and upstream target resolution

use crate::error::ParseError;
use std::fmt;

/// Port used when the request names none
pub const DEFAULT_PORT: u16 = 80;

/// First line of an HTTP request: `METHOD target VERSION`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    /// Absent for HTTP/0.9 style requests
    pub version: Option<String>,
}

impl RequestLine {
    /// Parse a single request line
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut parts = line.split_whitespace();
        let method = parts.next().ok_or(ParseError::EmptyRequest)?;
        let target = parts.next().ok_or_else(|| ParseError::MissingTarget {
            line: line.to_string(),
        })?;

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            version: parts.next().map(str::to_string),
        })
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.target)?;
        if let Some(version) = &self.version {
            write!(f, " {}", version)?;
        }
        Ok(())
    }
}

/// Origin server a request is forwarded to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub host: String,
    pub port: u16,
}

impl UpstreamTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Derive the target from a request target such as
    /// `http://example.com:8080/a/b`, `example.com/a` or `example.com:8080`
    ///
    /// Only the authority (the text before the first `/` once any scheme is
    /// stripped) is searched for a port, so a colon inside the path never
    /// changes the port.
    pub fn from_target(target: &str) -> Result<Self, ParseError> {
        let rest = match target.find("://") {
            Some(pos) => &target[pos + 3..],
            None => target,
        };

        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        Self::from_authority(&rest[..end]).map_err(|e| match e {
            ParseError::EmptyHost { .. } => ParseError::EmptyHost {
                target: target.to_string(),
            },
            other => other,
        })
    }

    /// Split a `host[:port]` authority, as found in a URL or `Host` header
    pub fn from_authority(authority: &str) -> Result<Self, ParseError> {
        let authority = authority.trim();
        // Drop any userinfo
        let authority = match authority.rfind('@') {
            Some(pos) => &authority[pos + 1..],
            None => authority,
        };

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, after) = bracketed
                .split_once(']')
                .ok_or_else(|| ParseError::EmptyHost {
                    target: authority.to_string(),
                })?;
            let port = match after {
                "" => None,
                after => Some(after.strip_prefix(':').ok_or_else(|| {
                    ParseError::InvalidPort {
                        port: after.to_string(),
                    }
                })?),
            };
            (host, port)
        } else {
            match authority.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };

        if host.is_empty() {
            return Err(ParseError::EmptyHost {
                target: authority.to_string(),
            });
        }

        let port = match port {
            None | Some("") => DEFAULT_PORT,
            Some(port) => port.parse().map_err(|_| ParseError::InvalidPort {
                port: port.to_string(),
            })?,
        };

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Parse the request line from raw request bytes and decide where to send it
///
/// Absolute and authority-form targets carry the host themselves. For an
/// origin-form target (`/path`) the `Host` header is used instead.
pub fn resolve(request: &[u8]) -> Result<(RequestLine, UpstreamTarget), ParseError> {
    let text = String::from_utf8_lossy(request);
    let first_line = text.lines().next().ok_or(ParseError::EmptyRequest)?;
    let line = RequestLine::parse(first_line)?;

    let target = if line.target.starts_with('/') {
        match host_header(&text) {
            Some(host) => UpstreamTarget::from_authority(host)?,
            None => {
                return Err(ParseError::EmptyHost {
                    target: line.target.clone(),
                })
            }
        }
    } else {
        UpstreamTarget::from_target(&line.target)?
    };

    Ok((line, target))
}

fn host_header(request: &str) -> Option<&str> {
    request
        .lines()
        .skip(1)
        .take_while(|line| !line.trim().is_empty())
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("host"))
        .map(|(_, value)| value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(t: &str) -> (String, u16) {
        let parsed = UpstreamTarget::from_target(t).unwrap();
        (parsed.host, parsed.port)
    }

    #[test]
    fn test_parse_request_line() {
        let line = RequestLine::parse("GET http://example.com/index.html HTTP/1.1\r").unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.target, "http://example.com/index.html");
        assert_eq!(line.version.as_deref(), Some("HTTP/1.1"));
        assert_eq!(line.to_string(), "GET http://example.com/index.html HTTP/1.1");
    }

    #[test]
    fn test_request_line_without_version() {
        let line = RequestLine::parse("GET example.com/").unwrap();
        assert_eq!(line.version, None);
    }

    #[test]
    fn test_request_line_errors() {
        assert_eq!(RequestLine::parse("  \r"), Err(ParseError::EmptyRequest));
        assert!(matches!(
            RequestLine::parse("GET"),
            Err(ParseError::MissingTarget { .. })
        ));
    }

    #[test]
    fn test_default_port() {
        assert_eq!(target("http://example.com/index.html"), ("example.com".into(), 80));
        assert_eq!(target("http://example.com"), ("example.com".into(), 80));
    }

    #[test]
    fn test_explicit_port() {
        assert_eq!(target("http://example.com:8080/a/b"), ("example.com".into(), 8080));
        assert_eq!(target("http://example.com:8080"), ("example.com".into(), 8080));
    }

    #[test]
    fn test_without_scheme() {
        assert_eq!(target("example.com:8080/a/b"), ("example.com".into(), 8080));
        assert_eq!(target("example.com/a/b"), ("example.com".into(), 80));
        assert_eq!(target("example.com"), ("example.com".into(), 80));
    }

    #[test]
    fn test_colon_in_path_is_not_a_port() {
        assert_eq!(target("http://example.com/a:b/c"), ("example.com".into(), 80));
        assert_eq!(target("example.com/time?at=12:30"), ("example.com".into(), 80));
        assert_eq!(target("http://example.com?q=a:1"), ("example.com".into(), 80));
    }

    #[test]
    fn test_ipv6_and_userinfo() {
        assert_eq!(target("http://[::1]:8080/x"), ("::1".into(), 8080));
        assert_eq!(target("http://[::1]/x"), ("::1".into(), 80));
        assert_eq!(target("http://user:pw@example.com/"), ("example.com".into(), 80));
        assert_eq!(UpstreamTarget::new("::1", 8080).to_string(), "[::1]:8080");
    }

    #[test]
    fn test_invalid_targets() {
        assert!(matches!(
            UpstreamTarget::from_target("http://example.com:http/"),
            Err(ParseError::InvalidPort { .. })
        ));
        assert!(matches!(
            UpstreamTarget::from_target("http://example.com:99999/"),
            Err(ParseError::InvalidPort { .. })
        ));
        assert!(matches!(
            UpstreamTarget::from_target("http:///path"),
            Err(ParseError::EmptyHost { .. })
        ));
        assert!(matches!(
            UpstreamTarget::from_target(""),
            Err(ParseError::EmptyHost { .. })
        ));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let t = "http://example.com:8081/x:y";
        assert_eq!(
            UpstreamTarget::from_target(t),
            UpstreamTarget::from_target(t)
        );
    }

    #[test]
    fn test_resolve_absolute_form() {
        let request = b"GET http://example.com:8080/a/b HTTP/1.1\r\nHost: other.org\r\n\r\n";
        let (line, target) = resolve(request).unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(target, UpstreamTarget::new("example.com", 8080));
    }

    #[test]
    fn test_resolve_origin_form_uses_host_header() {
        let request = b"GET /index.html HTTP/1.1\r\nhost: example.com:8000\r\n\r\n";
        let (_, target) = resolve(request).unwrap();
        assert_eq!(target, UpstreamTarget::new("example.com", 8000));

        let request = b"GET /index.html HTTP/1.1\r\nAccept: */*\r\n\r\n";
        assert!(matches!(resolve(request), Err(ParseError::EmptyHost { .. })));
    }

    #[test]
    fn test_resolve_empty() {
        assert_eq!(resolve(b""), Err(ParseError::EmptyRequest));
        assert_eq!(resolve(b"\r\n\r\n"), Err(ParseError::EmptyRequest));
    }
}
