//! HTTP server setup.
//!
//! # Responsibilities
//! - Assemble the shared `AppState`
//! - Build the route table with per-route access gates
//! - Wrap it in the request pipeline
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::{self, comments, healthcheck, posts, users};
use crate::auth::{require_access, Access, Argon2Hasher, CredentialHasher, TokenAuthority};
use crate::concurrency::ConcurrencyGuard;
use crate::config::AppConfig;
use crate::database::Database;
use crate::http::middleware::{authenticate_middleware, handle_panic};
use crate::http::request::MAX_BODY_BYTES;
use crate::lifecycle::Shutdown;
use crate::mailer::Mailer;
use crate::observability::metrics;
use crate::security::{
    cors_middleware, rate_limit_middleware, with_security_headers, CorsPolicy, RateLimiter,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<dyn Database>,
    pub authority: TokenAuthority,
    pub guard: ConcurrencyGuard,
    pub limiter: Arc<RateLimiter>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Wire every component to one store and one mailer.
    pub fn new(config: AppConfig, db: Arc<dyn Database>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            authority: TokenAuthority::new(db.clone()),
            guard: ConcurrencyGuard::new(db.clone()),
            limiter: Arc::new(RateLimiter::new(&config.limiter)),
            hasher: Arc::new(Argon2Hasher),
            config: Arc::new(config),
            db,
            mailer,
        }
    }
}

/// HTTP server for the blog API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Also owns the limiter reclamation task, which stops with the server.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reclaimer = if self.state.limiter.is_enabled() {
            let every = Duration::from_secs(self.state.config.limiter.sweep_interval_secs);
            Some(self.state.limiter.spawn_reclaimer(every, shutdown.subscribe()))
        } else {
            None
        };

        let mut signal = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = signal.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        if let Some(handle) = reclaimer {
            // Covers a server that stopped without a broadcast.
            shutdown.trigger();
            let _ = handle.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build the route table and wrap it in the request pipeline.
///
/// Outermost first: request id, tracing, metrics, panic containment,
/// timeout, security headers, CORS, rate limiting, authentication, then the
/// per-route gate.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let authenticated = || middleware::from_fn_with_state(Access::Authenticated, require_access);
    let activated = || middleware::from_fn_with_state(Access::Activated, require_access);

    let cors = Arc::new(CorsPolicy::new(state.config.cors.trusted_origins.clone()));
    let request_timeout = Duration::from_secs(state.config.timeouts.request_secs);

    let routes = Router::new()
        .route("/api/v1/healthcheck", get(healthcheck::healthcheck))
        .route("/api/v1/posts", get(posts::list_posts))
        .route(
            "/api/v1/post",
            post(posts::create_post).route_layer(activated()),
        )
        .route(
            "/api/v1/post/{id}",
            get(posts::show_post).merge(
                patch(posts::update_post)
                    .delete(posts::delete_post)
                    .route_layer(activated()),
            ),
        )
        .route(
            "/api/v1/posts/like/{id}",
            patch(posts::like_post).route_layer(authenticated()),
        )
        .route(
            "/api/v1/posts/dislike/{id}",
            patch(posts::dislike_post).route_layer(authenticated()),
        )
        .route("/api/v1/posts/comments/{id}", get(comments::list_comments))
        .route(
            "/api/v1/posts/comment",
            post(comments::create_comment).route_layer(authenticated()),
        )
        .route(
            "/api/v1/posts/comment/{id}",
            delete(comments::delete_comment).route_layer(authenticated()),
        )
        .route("/api/v1/auth/register", post(users::register))
        .route("/api/v1/auth/activate", put(users::activate))
        .route("/api/v1/auth/login", post(users::login))
        .route(
            "/api/v1/auth/logout",
            delete(users::logout).route_layer(authenticated()),
        )
        .route(
            "/api/v1/auth/password",
            put(users::change_password).route_layer(activated()),
        )
        .fallback(api::not_found)
        .method_not_allowed_fallback(api::method_not_allowed)
        .layer(middleware::from_fn_with_state(
            state.authority.clone(),
            authenticate_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(cors, cors_middleware))
        .with_state(state);

    with_security_headers(routes)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
                user_id = tracing::field::Empty,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
