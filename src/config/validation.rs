//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports non-zero, body limit non-zero)
//! - Detect conflicting instances (duplicate names or listen ports)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no proxy instances configured")]
    NoInstances,
    #[error("instance #{0} has an empty name")]
    EmptyName(usize),
    #[error("duplicate instance name `{0}`")]
    DuplicateName(String),
    #[error("instance `{name}` has zero {field}")]
    ZeroPort { name: String, field: &'static str },
    #[error("listen port {port} used by more than one instance")]
    DuplicateListenPort { port: u16 },
    #[error("admin router enabled on more than one instance")]
    MultipleAdmin,
    #[error("listener.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.instances.is_empty() {
        errors.push(ValidationError::NoInstances);
    }

    let mut names = HashSet::new();
    let mut ports = HashSet::new();
    for (index, instance) in config.instances.iter().enumerate() {
        if instance.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName(index));
        } else if !names.insert(instance.name.as_str()) {
            errors.push(ValidationError::DuplicateName(instance.name.clone()));
        }

        if instance.listen_port == 0 {
            errors.push(ValidationError::ZeroPort {
                name: instance.name.clone(),
                field: "listen_port",
            });
        } else if !ports.insert(instance.listen_port) {
            errors.push(ValidationError::DuplicateListenPort {
                port: instance.listen_port,
            });
        }

        if instance.target_port == 0 {
            errors.push(ValidationError::ZeroPort {
                name: instance.name.clone(),
                field: "target_port",
            });
        }
    }

    if config.instances.iter().filter(|i| i.admin).count() > 1 {
        errors.push(ValidationError::MultipleAdmin);
    }

    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
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
    use crate::config::schema::InstanceConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.instances = vec![
            InstanceConfig::new("A", 9000, 0, true),
            InstanceConfig::new("A", 9000, 19001, true),
            InstanceConfig::new("", 0, 19002, false),
        ];
        config.listener.max_body_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroPort {
                    name: "A".into(),
                    field: "target_port"
                },
                ValidationError::DuplicateName("A".into()),
                ValidationError::DuplicateListenPort { port: 9000 },
                ValidationError::EmptyName(2),
                ValidationError::ZeroPort {
                    name: "".into(),
                    field: "listen_port"
                },
                ValidationError::MultipleAdmin,
                ValidationError::ZeroBodyLimit,
            ]
        );
    }

    #[test]
    fn test_empty_instances_rejected() {
        let mut config = ProxyConfig::default();
        config.instances.clear();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::NoInstances])
        );
    }
}
