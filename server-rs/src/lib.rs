use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_mw,
    routing::{get, post, put},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use middleware::rate_limit::RateLimiter;
use services::demo_requests::{DemoRequestService, PgDemoRequestTable};
use services::fallback_store::FallbackStore;
use services::mailer::Mailer;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub mailer: Option<Mailer>,
    pub fallback: FallbackStore,
    pub demo_requests: DemoRequestService,
    pub rate_limiter: RateLimiter,
    pub form_rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, db: sqlx::PgPool) -> Self {
        let mailer = Mailer::new(&config.mail);
        if mailer.is_none() {
            tracing::warn!("mail API key or domain not set, email delivery disabled");
        }
        let fallback = FallbackStore::new(config.storage.fallback_path.as_ref().map(PathBuf::from));
        let demo_requests = DemoRequestService::new(
            Arc::new(PgDemoRequestTable { pool: db.clone() }),
            fallback.clone(),
        );
        let rate_limiter =
            RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_secs);
        let form_rate_limiter = RateLimiter::new(
            config.rate_limit.form_submit_max,
            config.rate_limit.window_secs,
        );

        Self {
            db,
            config: Arc::new(config),
            mailer,
            fallback,
            demo_requests,
            rate_limiter,
            form_rate_limiter,
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| o.parse().ok())
        .collect();

    let allow_origin = if origins.is_empty() || config.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // --- Auth routes (no auth required) ---
    let auth_routes = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route(
            "/me",
            get(routes::auth::me).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::auth::authenticate,
            )),
        );

    // --- Public forms ---
    let form_routes = Router::new()
        .route("/demo-requests", post(routes::forms::submit_demo_request))
        .route("/contact", post(routes::forms::submit_contact))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::form_rate_limit,
        ));

    // --- Tenant-scoped routes ---
    let tenant_routes = Router::new()
        .route(
            "/organization",
            get(routes::organization::get_organization)
                .put(routes::organization::update_organization),
        )
        .route("/sports", get(routes::sports::list_sports))
        .route(
            "/athletes",
            get(routes::athletes::list_athletes).post(routes::athletes::create_athlete),
        )
        .route(
            "/athletes/:id",
            get(routes::athletes::get_athlete)
                .put(routes::athletes::update_athlete)
                .delete(routes::athletes::delete_athlete),
        )
        .route(
            "/athletes/import",
            post(routes::athletes::import_athletes)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/payments",
            get(routes::payments::list_payments).post(routes::payments::create_payment),
        )
        .route(
            "/payments/:id",
            put(routes::payments::update_payment).delete(routes::payments::delete_payment),
        )
        .route(
            "/uploads/:kind",
            post(routes::uploads::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/uploads/:kind/template", get(routes::uploads::upload_template))
        .route(
            "/spending-limits",
            get(routes::spending_limits::list_limits)
                .post(routes::spending_limits::create_limit),
        )
        .route("/spending-limits/chart", get(routes::spending_limits::chart))
        .route(
            "/spending-limits/:id",
            put(routes::spending_limits::update_limit)
                .delete(routes::spending_limits::delete_limit),
        )
        .route("/analytics/equity", get(routes::analytics::equity_report))
        .route("/analytics/trends", get(routes::analytics::trend_report))
        .route("/reports/summary", get(routes::reports::summary))
        .route(
            "/notifications",
            post(routes::notifications::send_notification),
        )
        .layer(axum_mw::from_fn(middleware::tenant::resolve_tenant))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // --- Organization admin routes (own organization only) ---
    let org_admin_routes = Router::new()
        .route(
            "/users",
            get(routes::admin::list_users).post(routes::admin::create_user),
        )
        .route("/users/:id/role", put(routes::admin::set_role))
        .route("/users/:id/toggle-admin", post(routes::admin::toggle_admin))
        .layer(axum_mw::from_fn(middleware::tenant::resolve_tenant))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::admin::require_admin,
        ))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // --- Platform operator routes (data shared across organizations) ---
    let operator_routes = Router::new()
        .route("/demo-requests", get(routes::admin::list_demo_requests))
        .route("/sports", post(routes::sports::create_sport))
        .route(
            "/sports/:id",
            put(routes::sports::update_sport).delete(routes::sports::delete_sport),
        )
        .route("/debug/env", get(routes::debug::env_probe))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::admin::require_operator,
        ))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // --- Compose full API ---
    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", org_admin_routes.merge(operator_routes))
        .merge(form_routes)
        .merge(tenant_routes);

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(routes::health::health))
        // Global middleware
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
