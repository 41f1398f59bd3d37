//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, parallelism >= 1)
//! - Check that paired settings are given together
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RuntimeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use url::Url;

use crate::config::schema::RuntimeConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a configuration for semantic problems.
pub fn validate_config(config: &RuntimeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.cluster.server) {
        Ok(url) => {
            if url.scheme() != "https" && url.scheme() != "http" {
                errors.push(ValidationError::new(
                    "cluster.server",
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
            if url.host_str().map_or(true, str::is_empty) {
                errors.push(ValidationError::new("cluster.server", "missing host"));
            }
        }
        Err(e) => errors.push(ValidationError::new("cluster.server", e.to_string())),
    }

    if config.cluster.username.is_some() != config.cluster.password.is_some() {
        errors.push(ValidationError::new(
            "cluster.username",
            "username and password must be set together",
        ));
    }

    if !is_dns_label(&config.cluster.namespace) {
        errors.push(ValidationError::new(
            "cluster.namespace",
            format!("'{}' is not a valid DNS-1123 label", config.cluster.namespace),
        ));
    }

    if config.cluster.timeout_secs == 0 {
        errors.push(ValidationError::new("cluster.timeout_secs", "must be greater than 0"));
    }

    if config.workers.parallelism == 0 {
        errors.push(ValidationError::new("workers.parallelism", "must be at least 1"));
    }

    for (i, resource) in config.discovery.resources.iter().enumerate() {
        let field = format!("discovery.resources[{}]", i);
        if resource.kind.is_empty() {
            errors.push(ValidationError::new(&field, "kind is empty"));
        }
        if resource.resource.is_empty() {
            errors.push(ValidationError::new(&field, "resource is empty"));
        }
        if resource.versions.is_empty() || resource.versions.iter().any(String::is_empty) {
            errors.push(ValidationError::new(&field, "versions must be non-empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// DNS-1123 label: lower-case alphanumerics and '-', at most 63 chars,
/// starting and ending with an alphanumeric.
pub fn is_dns_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.is_empty() || bytes.len() > 63 {
        return false;
    }
    let valid = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    valid(&bytes[0])
        && valid(&bytes[bytes.len() - 1])
        && bytes.iter().all(|b| valid(b) || *b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ApiResourceConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RuntimeConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RuntimeConfig::default();
        config.cluster.server = "ftp://example.com".into();
        config.cluster.username = Some("admin".into());
        config.cluster.namespace = "Team_A".into();
        config.cluster.timeout_secs = 0;
        config.workers.parallelism = 0;
        config.discovery.resources.push(ApiResourceConfig {
            group: "example.io".into(),
            versions: vec![],
            kind: String::new(),
            resource: "widgets".into(),
            namespaced: true,
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"cluster.server"));
        assert!(fields.contains(&"cluster.username"));
        assert!(fields.contains(&"cluster.namespace"));
        assert!(fields.contains(&"cluster.timeout_secs"));
        assert!(fields.contains(&"workers.parallelism"));
        assert_eq!(
            errors.iter().filter(|e| e.field.starts_with("discovery.resources")).count(),
            2
        );
    }

    #[test]
    fn test_dns_label() {
        assert!(is_dns_label("default"));
        assert!(is_dns_label("team-a1"));
        assert!(!is_dns_label("-team"));
        assert!(!is_dns_label("team-"));
        assert!(!is_dns_label("Team"));
        assert!(!is_dns_label(""));
        assert!(!is_dns_label(&"a".repeat(64)));
    }
}
