//! Entry point: load config, wire dependencies, and run the server.

use axum::http::HeaderValue;
use starfeed::config::Config;
use starfeed::db;
use starfeed::error::AppError;
use starfeed::{create_app, AppState};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(AppError::from)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;
    tracing::info!("database ready");

    let state = AppState::new(db_pool, &config);
    let app = create_app(state)
        .layer(cors_layer(&config.cors_origin)?)
        .layer(TraceLayer::new_for_http());

    tracing::info!(addr = %config.server_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return Ok(layer.allow_origin(Any));
    }
    let origin: HeaderValue = origin
        .parse()
        .map_err(|e| anyhow::anyhow!("CORS_ORIGIN: {}", e))?;
    Ok(layer.allow_origin(origin))
}
