//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request pipeline produces:
//!     → access_log.rs (one line per completed request)
//!     → logging.rs (structured events from the interceptors)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (human or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod access_log;
pub mod logging;
pub mod metrics;
