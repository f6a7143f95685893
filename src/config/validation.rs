//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Validate static asset globs and log settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("routing.static_assets[{index}] is empty")]
    EmptyAssetPattern { index: usize },

    #[error("routing.static_assets[{index}] '{pattern}' must start with '/'")]
    RelativeAssetPattern { index: usize, pattern: String },

    #[error("routing.static_root must not be empty when static_assets are configured")]
    MissingStaticRoot,

    #[error("observability.log_level: unknown level '{0}'")]
    UnknownLogLevel(String),
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_body_bytes",
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    }

    for (index, pattern) in config.routing.static_assets.iter().enumerate() {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            errors.push(ValidationError::EmptyAssetPattern { index });
        } else if !pattern.starts_with('/') && !pattern.starts_with('*') {
            errors.push(ValidationError::RelativeAssetPattern {
                index,
                pattern: pattern.to_string(),
            });
        }
    }
    if !config.routing.static_assets.is_empty() && config.routing.static_root.trim().is_empty() {
        errors.push(ValidationError::MissingStaticRoot);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_secs = 0;
        config.routing.static_assets = vec!["".into(), "assets/*".into()];
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidAddress {
                    field: "listener.bind_address",
                    value: "nowhere".into()
                },
                ValidationError::Zero {
                    field: "timeouts.request_secs"
                },
                ValidationError::EmptyAssetPattern { index: 0 },
                ValidationError::RelativeAssetPattern {
                    index: 1,
                    pattern: "assets/*".into()
                },
                ValidationError::UnknownLogLevel("loud".into()),
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "bad".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_static_root_required_with_assets() {
        let mut config = AppConfig::default();
        config.routing.static_root = " ".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MissingStaticRoot])
        );

        config.routing.static_assets.clear();
        assert!(validate_config(&config).is_ok());
    }
}
