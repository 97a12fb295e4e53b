//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. All errors are collected so a
//! bad file can be fixed in one pass.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// Ten years. Keeps the token lifetimes within what `chrono::Duration::hours`
/// accepts.
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.database.path.trim().is_empty() {
        errors.push(ValidationError::new("database.path", "must not be empty"));
    }
    if config.database.query_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "database.query_timeout_ms",
            "must be greater than zero",
        ));
    }

    let limiter = &config.limiter;
    if limiter.enabled {
        if !(limiter.requests_per_second.is_finite() && limiter.requests_per_second > 0.0) {
            errors.push(ValidationError::new(
                "limiter.requests_per_second",
                "must be a positive number",
            ));
        }
        if limiter.burst == 0 {
            errors.push(ValidationError::new("limiter.burst", "must be at least 1"));
        }
        if limiter.sweep_interval_secs == 0 {
            errors.push(ValidationError::new(
                "limiter.sweep_interval_secs",
                "must be greater than zero",
            ));
        }
    }

    for (field, hours) in [
        ("tokens.activation_ttl_hours", config.tokens.activation_ttl_hours),
        ("tokens.authentication_ttl_hours", config.tokens.authentication_ttl_hours),
    ] {
        if hours == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        } else if hours > MAX_TOKEN_TTL_HOURS {
            errors.push(ValidationError::new(
                field,
                format!("must be at most {MAX_TOKEN_TTL_HOURS}"),
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    for origin in &config.cors.trusted_origins {
        if axum::http::HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.trusted_origins",
                format!("'{origin}' is not a valid header value"),
            ));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
