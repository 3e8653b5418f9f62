use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use clap::Parser;
use ir_common::db::{
    DbPoolError, MigrationError, PgProfileStore, create_pool_from_url,
    create_pool_from_url_checked, run_migrations,
};
use ir_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use ir_common::{MemoryProfileStore, ProfileEngine};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod rate_limit;

use auth::AuthConfig;
use config::{AppConfig, Cli, ConfigError};
use rate_limit::{ProfileRateLimiter, RateLimitConfig};

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_BODY_BYTES: usize = 16 * 1024;
const DRAIN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database pool: {0}")]
    Pool(#[from] DbPoolError),
    #[error("migrations: {0}")]
    Migrations(#[from] MigrationError),
    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Backs readiness; the engine holds its own handles to the same store.
    pub store: Arc<PgProfileStore>,
    pub engine: Arc<ProfileEngine>,
    pub(crate) rate_limiter: ProfileRateLimiter,
    pub readiness: Arc<AtomicBool>,
}

pub type SharedState = Arc<AppState>;

impl FromRef<SharedState> for AuthConfig {
    fn from_ref(state: &SharedState) -> AuthConfig {
        state.config.auth.clone()
    }
}

fn cors(origins: &[String]) -> CorsLayer {
    let origins = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(auth::API_KEY_HEADER),
            HeaderName::from_static(auth::USER_ID_HEADER),
            HeaderName::from_static(auth::USER_EMAIL_HEADER),
        ])
        .allow_credentials(true)
}

/// Expose the request id to error envelopes built further down the stack.
async fn scope_request_id(req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    error::with_request_id(request_id, next.run(req)).await
}

pub fn create_router(state: SharedState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        tracing::info_span!(
            "profile_http",
            method = %request.method(),
            path = %request.uri().path(),
            request_id,
        )
    });

    Router::new()
        .route("/livez", get(handlers::health::livez))
        .route("/readyz", get(handlers::health::readyz))
        .route("/health", get(handlers::health::readyz))
        .route("/api/profile/me", get(handlers::profile::get_my_profile))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_by_peer,
        ))
        .layer(middleware::from_fn(scope_request_id))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors(&state.config.cors_origins))
        .with_state(state)
}

fn assemble_state(config: AppConfig, store: PgProfileStore, engine: ProfileEngine) -> SharedState {
    Arc::new(AppState {
        config,
        store: Arc::new(store),
        engine: Arc::new(engine),
        rate_limiter: ProfileRateLimiter::new(RateLimitConfig::from_env()),
        readiness: Arc::new(AtomicBool::new(true)),
    })
}

/// Router state for tests: api-key auth with `api_key`, an engine over an
/// empty in-memory store, and a pool that never connects.
pub fn test_state(api_key: &str) -> SharedState {
    let engine = ProfileEngine::from_store(
        Arc::new(MemoryProfileStore::new()),
        Default::default(),
    );
    test_state_with_engine(api_key, engine)
}

pub fn test_state_with_engine(api_key: &str, engine: ProfileEngine) -> SharedState {
    let config = AppConfig::for_tests(AuthConfig::ApiKey {
        key: api_key.to_string(),
    });
    let pool = create_pool_from_url(&config.database_url)
        .expect("pool should build without connecting");
    let store = PgProfileStore::new(pool, config.store_timeout);
    assemble_state(config, store, engine)
}

pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));

    let config = AppConfig::from_cli(Cli::parse())?;
    let pool = create_pool_from_url_checked(&config.database_url).await?;
    run_migrations(&pool).await?;

    let store = PgProfileStore::new(pool, config.store_timeout);
    let engine = ProfileEngine::from_store(Arc::new(store.clone()), config.engine.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!(
        %addr,
        auth_mode = ?config.auth.mode(),
        scan_limit = config.engine.scan_limit,
        store_timeout_ms = config.store_timeout.as_millis() as u64,
        "ir-api listening"
    );

    let state = assemble_state(config, store, engine);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        create_router(state.clone()).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(drain_on_signal(state))
    .await?;

    Ok(())
}

/// Flip readiness first so balancers stop routing here, then let axum drain.
async fn drain_on_signal(state: SharedState) {
    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining");
    state.readiness.store(false, Ordering::SeqCst);
    tokio::time::sleep(DRAIN_GRACE).await;
}
