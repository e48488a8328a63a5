//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Build instances → Bind every port → Banner → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Each instance drains and stops
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a port that cannot be bound aborts startup before serving
//! - Instances run independently; one failing stops the rest

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::ProxyRegistry;
