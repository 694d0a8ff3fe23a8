//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0, UAST depth > 0)
//! - Check the engine address is a usable URI
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::engine::endpoint_uri;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("engine.address must not be empty")]
    EmptyEngineAddress,

    #[error("engine.address {address:?} is not a valid URI: {reason}")]
    InvalidEngineAddress { address: String, reason: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    let address = config.engine.address.trim();
    if address.is_empty() {
        errors.push(ValidationError::EmptyEngineAddress);
    } else if let Err(e) = endpoint_uri(address) {
        errors.push(ValidationError::InvalidEngineAddress {
            address: address.to_string(),
            reason: e.to_string(),
        });
    }

    let positive = [
        ("engine.connect_timeout_secs", config.engine.connect_timeout_secs),
        ("engine.call_timeout_secs", config.engine.call_timeout_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == Some(0) {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.limits.max_body_bytes == Some(0) {
        errors.push(ValidationError::Zero { field: "limits.max_body_bytes" });
    }

    if config.engine.max_uast_depth == 0 {
        errors.push(ValidationError::Zero { field: "engine.max_uast_depth" });
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.host = " ".into();
        config.engine.address = String::new();
        config.engine.call_timeout_secs = Some(0);
        config.limits.max_body_bytes = Some(0);
        config.observability.metrics_address = Some("not-an-addr".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::EmptyHost));
        assert!(errors.contains(&ValidationError::EmptyEngineAddress));
        assert!(errors.contains(&ValidationError::Zero { field: "engine.call_timeout_secs" }));
    }

    #[test]
    fn test_invalid_engine_address() {
        let mut config = ProxyConfig::default();
        config.engine.address = "not a uri".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidEngineAddress { .. }));
    }

    #[test]
    fn test_zero_uast_depth() {
        let mut config = ProxyConfig::default();
        config.engine.max_uast_depth = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::Zero { field: "engine.max_uast_depth" }]);
    }
}
