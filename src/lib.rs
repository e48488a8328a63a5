//! Quickstart node proxy library.
//!
//! Three public ports, each in front of one local backend, with CORS
//! injection, JSON normalization of POST bodies and optional traffic logging.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::{ProxyError, ProxyInstance};
pub use lifecycle::{ProxyRegistry, Shutdown};
