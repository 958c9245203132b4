/*!
 * HTTP control API
 *
 * - `GET /health`: liveness, uptime, stats and active configuration
 * - `GET /api/stats`: server, orchestrator, assessor and scheduler stats
 * - `POST /api/check/manual`: run a full batch now
 * - `POST /api/check/single`: assess one translation
 * - `POST /api/check/batch`: assess up to 50 translations
 * - `GET /api/history`: recent batch run summaries
 * - `POST /api/schedule/{start|stop}`: control the scheduler
 *
 * The per-client rate limit applies to the `/api` routes only, so `/health`
 * keeps answering liveness probes.
 */

pub mod handlers;
pub mod middleware;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use log::{info, warn};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::app_config::{Config, Environment};
use crate::orchestrator::BatchOrchestrator;
use crate::rate_limiter::KeyedRateLimiter;
use crate::scheduler::Scheduler;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<BatchOrchestrator>,
    pub scheduler: Arc<Scheduler>,
    pub config: Arc<Config>,
    pub limiter: Arc<KeyedRateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<BatchOrchestrator>, scheduler: Arc<Scheduler>, config: Arc<Config>) -> Self {
        let limiter = KeyedRateLimiter::new(
            config.server.rate_limit_max_requests,
            Duration::from_millis(config.server.rate_limit_window_ms),
        );
        Self {
            orchestrator,
            scheduler,
            config,
            limiter: Arc::new(limiter),
            started_at: Instant::now(),
        }
    }

    /// Whether raw internal error messages may reach clients
    pub fn expose_errors(&self) -> bool {
        self.config.server.environment == Environment::Development
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!("Invalid CORS origin '{}', cross-origin requests will be refused", origin);
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Every route, with the rate limit on the `/api` ones
pub fn routes(state: &AppState) -> Router<AppState> {
    let api = Router::new()
        .route("/api/stats", get(handlers::stats))
        .route("/api/check/manual", post(handlers::manual_check))
        .route("/api/check/single", post(handlers::single_check))
        .route("/api/check/batch", post(handlers::batch_check))
        .route("/api/history", get(handlers::history))
        .route("/api/schedule/:action", post(handlers::schedule))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), middleware::rate_limit));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .fallback(handlers::not_found)
}

/// Build the router with every route and middleware
pub fn build_router(state: AppState) -> Router {
    let router = routes(&state);
    with_middleware(router, state)
}

/// Wrap `router` in the request-wide middleware: request log, body cap, security
/// headers, CORS and the panic catcher
pub fn with_middleware(router: Router<AppState>, state: AppState) -> Router {
    let expose = state.expose_errors();
    let body_limit = state.config.server.body_limit_bytes;
    let cors = cors_layer(&state.config.server.cors_origin);

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("same-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("0"),
        ));

    router
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(security_headers)
        .layer(cors)
        .layer(CatchPanicLayer::custom(move |panic| middleware::panic_response(panic, expose)))
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve<F>(state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server.port));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Control API listening on http://{}", addr);

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Control API stopped");
    Ok(())
}
