//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Addresses parse, paths and prefixes are usable, timeouts > 0
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ShieldConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ShieldConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("rules.file must not be empty")]
    EmptyRulesFile,

    #[error("admin.prefix '{0}' must start with '/' and not be the root")]
    InvalidAdminPrefix(String),

    #[error("admin.api_key must not be empty when set")]
    EmptyApiKey,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

fn check_addr(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

pub fn validate_config(config: &ShieldConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr("listener.bind_address", &config.listener.bind_address, &mut errors);
    if let Some(upstream) = &config.upstream.address {
        check_addr("upstream.address", upstream, &mut errors);
    }
    if config.observability.metrics_enabled {
        check_addr("observability.metrics_address", &config.observability.metrics_address, &mut errors);
    }

    if config.rules.file.trim().is_empty() {
        errors.push(ValidationError::EmptyRulesFile);
    }

    let prefix = &config.admin.prefix;
    if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
        errors.push(ValidationError::InvalidAdminPrefix(prefix.clone()));
    }
    if config.admin.api_key.as_deref().is_some_and(str::is_empty) {
        errors.push(ValidationError::EmptyApiKey);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("upstream.timeout_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
