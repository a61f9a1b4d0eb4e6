//! Configuration validation

use super::schema::{Config, ProxyConfig};
use crate::error::{Result, ValidationError};
use tokio::sync::Semaphore;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate entire configuration
    pub fn validate(config: &Config) -> Result<()> {
        Self::validate_proxy(&config.proxy)?;
        Ok(())
    }

    fn validate_proxy(proxy: &ProxyConfig) -> Result<()> {
        if proxy.backlog == 0 {
            return Err(ValidationError::ZeroBacklog.into());
        }

        if proxy.buffer_size == 0 {
            return Err(ValidationError::ZeroBufferSize.into());
        }

        if proxy.max_request_bytes < proxy.buffer_size {
            return Err(ValidationError::RequestLimitTooSmall {
                max_request_bytes: proxy.max_request_bytes,
                buffer_size: proxy.buffer_size,
            }
            .into());
        }

        if proxy.max_connections == Some(0) {
            return Err(ValidationError::ZeroMaxConnections.into());
        }

        if let Some(value) = proxy.max_connections.filter(|&n| n > Semaphore::MAX_PERMITS) {
            return Err(ValidationError::TooManyConnections {
                value,
                max: Semaphore::MAX_PERMITS,
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProxyError;

    fn with_proxy(proxy: ProxyConfig) -> Config {
        Config {
            proxy,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(ConfigValidator::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_buffer_size() {
        let config = with_proxy(ProxyConfig {
            buffer_size: 0,
            ..Default::default()
        });
        assert!(matches!(
            ConfigValidator::validate(&config),
            Err(ProxyError::Validation(ValidationError::ZeroBufferSize))
        ));
    }

    #[test]
    fn test_request_limit_below_buffer() {
        let config = with_proxy(ProxyConfig {
            buffer_size: 4096,
            max_request_bytes: 1024,
            ..Default::default()
        });
        assert!(matches!(
            ConfigValidator::validate(&config),
            Err(ProxyError::Validation(
                ValidationError::RequestLimitTooSmall { .. }
            ))
        ));
    }

    #[test]
    fn test_zero_max_connections() {
        let config = with_proxy(ProxyConfig {
            max_connections: Some(0),
            ..Default::default()
        });
        assert!(matches!(
            ConfigValidator::validate(&config),
            Err(ProxyError::Validation(ValidationError::ZeroMaxConnections))
        ));
    }

    #[test]
    fn test_max_connections_above_semaphore_limit() {
        let config = with_proxy(ProxyConfig {
            max_connections: Some(Semaphore::MAX_PERMITS + 1),
            ..Default::default()
        });
        assert!(matches!(
            ConfigValidator::validate(&config),
            Err(ProxyError::Validation(
                ValidationError::TooManyConnections { .. }
            ))
        ));

        let config = with_proxy(ProxyConfig {
            max_connections: Some(Semaphore::MAX_PERMITS),
            ..Default::default()
        });
        assert!(ConfigValidator::validate(&config).is_ok());
    }
}
