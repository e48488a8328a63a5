use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::Serialize;

use crate::config::loader::parse_flag;
use crate::config::{InstanceConfig, VerbosityConfig, VerbosityHandle};
use crate::http::error::plain_text;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub instances: Vec<InstanceConfig>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        instances: state.instances.to_vec(),
    })
}

pub async fn get_env(State(state): State<AppState>) -> Json<VerbosityConfig> {
    Json(state.verbosity.load_full().as_ref().clone())
}

/// Update any subset of the verbosity flags, e.g.
/// `/admin/set-env?verbose=true&formatJson=true`.
pub async fn set_env(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<VerbosityConfig>, Response> {
    let update = VerbosityUpdate::from_params(&params)
        .map_err(|message| plain_text(StatusCode::BAD_REQUEST, message))?;

    let next = update.store(&state.verbosity);
    tracing::info!(verbosity = ?next, "Verbosity updated via admin");
    Ok(Json(next))
}

pub async fn not_found() -> Response {
    plain_text(StatusCode::NOT_FOUND, "Not Found")
}

/// Flags named in a `set-env` request; absent flags keep their current value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct VerbosityUpdate {
    verbose: Option<bool>,
    show_query_string: Option<bool>,
    show_body: Option<bool>,
    format_json: Option<bool>,
}

impl VerbosityUpdate {
    /// Keys are accepted in snake_case or camelCase.
    fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let mut update = Self::default();
        for (key, raw) in params {
            let slot = match key.as_str() {
                "verbose" => &mut update.verbose,
                "show_query_string" | "showQueryString" => &mut update.show_query_string,
                "show_body" | "showBody" => &mut update.show_body,
                "format_json" | "formatJson" => &mut update.format_json,
                _ => return Err(format!("unknown setting `{key}`")),
            };
            let flag =
                parse_flag(raw).ok_or_else(|| format!("invalid boolean `{raw}` for `{key}`"))?;
            *slot = Some(flag);
        }
        Ok(update)
    }

    fn apply(&self, verbosity: &mut VerbosityConfig) {
        let fields = [
            (&mut verbosity.verbose, self.verbose),
            (&mut verbosity.show_query_string, self.show_query_string),
            (&mut verbosity.show_body, self.show_body),
            (&mut verbosity.format_json, self.format_json),
        ];
        for (slot, value) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }

    /// Swap the update into the shared handle, retrying against concurrent
    /// writers, and return the value that was stored.
    fn store(&self, handle: &VerbosityHandle) -> VerbosityConfig {
        let applied = |current: &Arc<VerbosityConfig>| {
            let mut next = current.as_ref().clone();
            self.apply(&mut next);
            next
        };
        let previous = handle.rcu(|current| applied(current));
        applied(&previous)
    }
}
