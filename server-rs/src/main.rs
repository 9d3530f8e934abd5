use std::net::SocketAddr;

use nil_tracker_api::{
    build_router,
    config::{Config, DEFAULT_JWT_SECRET},
    db, AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .json()
        .init();

    if config.is_production() && config.jwt.secret == DEFAULT_JWT_SECRET {
        return Err("JWT_SECRET must be set in production".into());
    }

    if config.operator_emails.is_empty() {
        tracing::warn!("OPERATOR_EMAILS not set, platform admin routes are unreachable");
    }

    let pool = db::create_pool(&config).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let env = config.app_env.clone();

    let state = AppState::new(config, pool);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, env = %env, "NIL tracker API listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
