//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and known enumerations
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ServerConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use tokio::sync::Semaphore;

use crate::config::schema::ServerConfig;

pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
pub const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `listener.bind_address`.
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            message: format!("'{}' is not a socket address", config.listener.bind_address),
        });
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError {
            field: "listener.max_connections",
            message: "must be greater than 0".to_string(),
        });
    } else if config.listener.max_connections > Semaphore::MAX_PERMITS {
        errors.push(ValidationError {
            field: "listener.max_connections",
            message: format!("must be at most {}", Semaphore::MAX_PERMITS),
        });
    }

    if config.http.read_buffer_size == 0 {
        errors.push(ValidationError {
            field: "http.read_buffer_size",
            message: "must be greater than 0".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError {
            field: "observability.log_level",
            message: format!(
                "'{}' is not one of {}",
                config.observability.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if !LOG_FORMATS.contains(&config.observability.log_format.as_str()) {
        errors.push(ValidationError {
            field: "observability.log_format",
            message: format!(
                "'{}' is not one of {}",
                config.observability.log_format,
                LOG_FORMATS.join(", ")
            ),
        });
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
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "localhost".to_string();
        config.listener.max_connections = 0;
        config.http.read_buffer_size = 0;
        config.observability.log_level = "loud".to_string();
        config.observability.log_format = "xml".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            [
                "listener.bind_address",
                "listener.max_connections",
                "http.read_buffer_size",
                "observability.log_level",
                "observability.log_format",
            ]
        );
        assert!(errors[3].to_string().contains("loud"));
    }

    #[test]
    fn max_connections_bounded_by_semaphore() {
        let mut config = ServerConfig::default();
        config.listener.max_connections = Semaphore::MAX_PERMITS;
        assert_eq!(validate_config(&config), Ok(()));

        config.listener.max_connections = Semaphore::MAX_PERMITS + 1;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "listener.max_connections");
        assert!(errors[0].message.contains("at most"));
    }
}
