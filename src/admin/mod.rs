//! Admin router, mounted under `/admin` on the instance that enables it.
//!
//! Requests under the prefix never reach the backend: unknown paths get a
//! local `404`.

pub mod handlers;

use axum::{routing::get, Router};

use self::handlers::*;
use crate::http::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/env", get(get_env))
        .route("/set-env", get(set_env))
        .fallback(not_found)
}
