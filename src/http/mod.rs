//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router: favicon, admin, proxy fallback)
//!     → request.rs (retarget, strip hop-by-hop, JSON-normalize POST, log)
//!     → backend over loopback
//!     → response.rs (CORS headers, optional body tee + log)
//!     → Send to client
//!
//! On backend failure:
//!     → error.rs (fixed-shape text/plain response)
//! ```

pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use error::{ErrorTranslator, ProxyError};
pub use request::RequestInterceptor;
pub use response::{LoggingBody, ResponseInterceptor};
pub use server::{AppState, ProxyInstance};
