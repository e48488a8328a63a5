//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML file.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// Shared, lock-free handle to the live verbosity snapshot.
pub type VerbosityHandle = Arc<ArcSwap<VerbosityConfig>>;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration shared by every instance.
    pub listener: ListenerConfig,

    /// Diagnostic logging flags.
    pub verbosity: VerbosityConfig,

    /// Error response settings.
    pub errors: ErrorsConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Proxy instances, one per public port.
    pub instances: Vec<InstanceConfig>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            verbosity: VerbosityConfig::default(),
            errors: ErrorsConfig::default(),
            observability: ObservabilityConfig::default(),
            instances: InstanceConfig::standard(),
        }
    }
}

impl ProxyConfig {
    /// Build the shared verbosity handle seeded from this config.
    pub fn verbosity_handle(&self) -> VerbosityHandle {
        Arc::new(ArcSwap::from_pointee(self.verbosity.clone()))
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host the public ports bind to.
    pub bind_host: String,

    /// Host the backends listen on.
    pub backend_host: String,

    /// Largest POST body accepted for JSON re-serialization.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            backend_host: "127.0.0.1".to_string(),
            max_body_bytes: 100 * 1024,
        }
    }
}

/// Verbosity flags controlling what the interceptors log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct VerbosityConfig {
    /// Master switch; nothing below is logged unless set.
    pub verbose: bool,
    /// Log the query string of forwarded requests.
    pub show_query_string: bool,
    /// Log the JSON body of forwarded POST requests.
    pub show_body: bool,
    /// Pretty-print logged JSON.
    pub format_json: bool,
}

/// Error translation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorsConfig {
    /// Put the upstream error detail in the `500` body.
    /// When false a generic message is sent instead.
    pub expose_detail: bool,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self { expose_detail: true }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Color the access log and banner.
    pub ansi: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Address for the Prometheus exporter.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            ansi: true,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// One public port bound to one backend port.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstanceConfig {
    /// Instance name, used to tag response logs.
    pub name: String,

    /// Public port.
    pub listen_port: u16,

    /// Backend port on `listener.backend_host`.
    pub target_port: u16,

    /// Serve the admin router under `/admin`.
    #[serde(default)]
    pub admin: bool,
}

impl InstanceConfig {
    pub fn new(name: impl Into<String>, listen_port: u16, target_port: u16, admin: bool) -> Self {
        Self {
            name: name.into(),
            listen_port,
            target_port,
            admin,
        }
    }

    /// The fixed full node / solidity node / event server table.
    pub fn standard() -> Vec<Self> {
        vec![
            Self::new("FULL-NODE", 8090, 18190, true),
            Self::new("SOLIDITY-NODE", 8091, 18191, false),
            Self::new("EVENT-SERVER", 8092, 18891, false),
        ]
    }

    /// Human label for the banner: `SOLIDITY-NODE` becomes `Solidity Node`.
    pub fn label(&self) -> String {
        self.name
            .split(['-', '_'])
            .filter(|word| !word.is_empty())
            .map(|word| {
                let lower = word.to_lowercase();
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_instance_table() {
        let config = ProxyConfig::default();
        let table: Vec<_> = config
            .instances
            .iter()
            .map(|i| (i.name.as_str(), i.listen_port, i.target_port, i.admin))
            .collect();

        assert_eq!(
            table,
            vec![
                ("FULL-NODE", 8090, 18190, true),
                ("SOLIDITY-NODE", 8091, 18191, false),
                ("EVENT-SERVER", 8092, 18891, false),
            ]
        );
    }

    #[test]
    fn test_labels() {
        let labels: Vec<_> = InstanceConfig::standard().iter().map(|i| i.label()).collect();
        assert_eq!(labels, vec!["Full Node", "Solidity Node", "Event Server"]);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.instances.len(), 3);
        assert!(!config.verbosity.verbose);
        assert!(config.errors.expose_detail);
        assert_eq!(config.listener.max_body_bytes, 100 * 1024);
    }

    #[test]
    fn test_partial_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [verbosity]
            verbose = true
            format_json = true

            [[instances]]
            name = "ONLY"
            listen_port = 9000
            target_port = 19000
            "#,
        )
        .unwrap();

        assert!(config.verbosity.verbose);
        assert!(config.verbosity.format_json);
        assert!(!config.verbosity.show_body);
        assert_eq!(config.instances, vec![InstanceConfig::new("ONLY", 9000, 19000, false)]);
    }

    #[test]
    fn test_verbosity_handle_snapshot() {
        let mut config = ProxyConfig::default();
        config.verbosity.verbose = true;
        let handle = config.verbosity_handle();
        let before = handle.load_full();

        handle.store(Arc::new(VerbosityConfig::default()));

        assert!(before.verbose);
        assert!(!handle.load().verbose);
    }
}
