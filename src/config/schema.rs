//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! dispatcher. All types derive Serde traits for deserialization from
//! config files, and every field has a default so an empty file is valid.

use serde::{Deserialize, Serialize};

use crate::routing::{CompileOptions, RegistryOptions};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Route table flags and static asset passthrough.
    pub routing: RoutingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Largest request body buffered before dispatch.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Route table configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// `/User` and `/user` are different routes.
    pub case_sensitive: bool,

    /// `/user` and `/user/` are different routes.
    pub strict: bool,

    /// Registering the same verb and path twice fails startup.
    pub reject_duplicates: bool,

    /// Globs of paths served from `static_root` without routing.
    pub static_assets: Vec<String>,

    /// Directory static assets are served from.
    pub static_root: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            strict: false,
            reject_duplicates: false,
            static_assets: vec!["/assets/*".to_string(), "/favicon.ico".to_string()],
            static_root: "public".to_string(),
        }
    }
}

impl RoutingConfig {
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            compile: CompileOptions {
                case_sensitive: self.case_sensitive,
                strict: self.strict,
            },
            reject_duplicates: self.reject_duplicates,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
