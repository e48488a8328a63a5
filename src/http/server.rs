//! Proxy instance: one public port in front of one backend port.
//!
//! # Responsibilities
//! - Build the Axum router (favicon, optional admin, proxy fallback)
//! - Wire up middleware (panic recovery, access log, tracing)
//! - Forward requests through the request and response interceptors
//! - Serve until the shutdown signal fires

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{uri::Authority, Request, StatusCode},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::admin;
use crate::config::{InstanceConfig, ProxyConfig, VerbosityConfig, VerbosityHandle};
use crate::http::error::{panic_response, ErrorTranslator, ProxyError};
use crate::http::request::RequestInterceptor;
use crate::http::response::ResponseInterceptor;
use crate::observability::access_log::{access_log, AccessLogger};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub instance: Arc<InstanceConfig>,
    pub target: Authority,
    pub client: Client<HttpConnector, Body>,
    pub verbosity: VerbosityHandle,
    pub errors: ErrorTranslator,
    pub max_body_bytes: usize,
    /// Every instance in the process, reported by the admin status route.
    pub instances: Arc<[InstanceConfig]>,
}

/// A single public listener bound to a single backend.
pub struct ProxyInstance {
    config: InstanceConfig,
    router: Router,
}

impl ProxyInstance {
    /// Build the instance `instance` out of the shared `config`.
    pub fn new(
        instance: InstanceConfig,
        config: &ProxyConfig,
        verbosity: VerbosityHandle,
    ) -> Result<Self, ProxyError> {
        let target = Authority::from_str(&format!(
            "{}:{}",
            config.listener.backend_host, instance.target_port
        ))
        .map_err(axum::http::Error::from)?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            instance: Arc::new(instance.clone()),
            target,
            client,
            verbosity,
            errors: ErrorTranslator::new(config.errors.expose_detail),
            max_body_bytes: config.listener.max_body_bytes,
            instances: config.instances.clone().into(),
        };
        let access = AccessLogger::new(&instance.name, config.observability.ansi);

        Ok(Self {
            router: Self::build_router(state, access),
            config: instance,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, access: AccessLogger) -> Router {
        let mut router = Router::new()
            .route("/favicon.ico", any(favicon))
            .route("/favicon.ico/{*rest}", any(favicon));
        if state.instance.admin {
            router = router.nest("/admin", admin::router());
        }

        router
            .fallback(proxy_handler)
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(access, access_log))
            .layer(TraceLayer::new_for_http())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ProxyError> {
        let addr = listener.local_addr().map_err(ProxyError::Serve)?;
        tracing::info!(
            who = %self.config.name,
            address = %addr,
            target_port = self.config.target_port,
            "Proxy instance serving"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(ProxyError::Serve)?;

        tracing::info!(who = %self.config.name, "Proxy instance stopped");
        Ok(())
    }
}

async fn favicon() -> StatusCode {
    StatusCode::OK
}

/// Forward a request to the instance's backend.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let verbosity = state.verbosity.load_full();
    let path = request.uri().path().to_string();

    match forward(&state, &verbosity, &path, request).await {
        Ok(response) => response,
        Err(e) => {
            if matches!(e, ProxyError::Upstream(_)) {
                metrics::record_upstream_error(&state.instance.name);
            }
            state.errors.respond(&state.instance.name, &e)
        }
    }
}

async fn forward(
    state: &AppState,
    verbosity: &VerbosityConfig,
    path: &str,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let outgoing = RequestInterceptor::new(verbosity, state.max_body_bytes)
        .prepare(request, &state.target)
        .await?;

    tracing::debug!(
        who = %state.instance.name,
        method = %outgoing.method(),
        uri = %outgoing.uri(),
        "Forwarding request"
    );

    let response = state.client.request(outgoing).await?;
    Ok(ResponseInterceptor::new(&state.instance.name, verbosity).intercept(path, response))
}
