//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → only the verbosity snapshot is swapped in
//! ```
//!
//! # Design Decisions
//! - The instance table is fixed for the process lifetime
//! - All fields have defaults so an empty file is a valid config
//! - Verbosity is the only live setting; readers take a snapshot per request

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{
    ErrorsConfig, InstanceConfig, ListenerConfig, ObservabilityConfig, ProxyConfig,
    VerbosityConfig, VerbosityHandle,
};
