//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with admin routes and the upstream fallback
//! - Wire up middleware (request ID, tracing, CORS, timeout, body limit)
//! - Screen every request, admin routes included, with the interceptor
//! - Bind server to listener and drain on shutdown
//!
//! # Layer order (outermost first)
//! ```text
//! request id → trace → propagate id → CORS → timeout → body limit
//!     → interceptor → admin routes | upstream fallback
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::{CorsConfig, ShieldConfig};
use crate::http::middleware::interceptor_middleware;
use crate::http::upstream::{Upstream, UpstreamError};
use crate::rules::Registry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub upstream: Option<Arc<Upstream>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// HTTP front end: filter, admin API, upstream forwarding.
pub struct HttpServer {
    router: Router,
    config: ShieldConfig,
}

impl HttpServer {
    /// Create a new HTTP server around an already-built registry.
    pub fn new(config: ShieldConfig, registry: Arc<Registry>) -> Result<Self, ServerError> {
        let upstream = match &config.upstream.address {
            Some(address) => Some(Arc::new(Upstream::new(
                address,
                Duration::from_secs(config.upstream.timeout_secs),
            )?)),
            None => None,
        };

        let state = AppState { registry, upstream };
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ShieldConfig, state: AppState) -> Router {
        let admin_prefix = config.admin.prefix.trim_end_matches('/');
        let registry = state.registry.clone();

        Router::new()
            .nest(admin_prefix, setup_admin_router(&config.admin))
            .fallback(forward_handler)
            .with_state(state)
            .layer(middleware::from_fn_with_state(registry, interceptor_middleware))
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(cors_layer(&config.cors))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = ?self.config.upstream.address,
            admin_prefix = %self.config.admin.prefix,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let list: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(list)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Requests that passed the interceptor and matched no admin route.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match &state.upstream {
        Some(upstream) => upstream.forward(request).await,
        None => (StatusCode::NOT_FOUND, "No upstream configured").into_response(),
    }
}
