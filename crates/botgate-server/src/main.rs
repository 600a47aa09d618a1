//! Botgate API server
//!
//! Wires the dispatch core to its infrastructure: Postgres repositories,
//! per-messenger platform adapters, and the axum HTTP surface (inbound
//! webhooks + operator routes).

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod adapters;
mod auth;
mod config;
mod models;
mod routes;

use adapters::{AdapterFactory, PgAccountRepository, PgMenuRepository, PgMessengerRepository};
use botgate::{Dispatcher, HandlerRegistry};
use config::Config;

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub messengers: Arc<PgMessengerRepository>,
    pub dispatcher: Arc<Dispatcher>,
    pub adapters: Arc<AdapterFactory>,
    pub public_url: String,
}

#[derive(Serialize)]
struct HealthCheck {
    status: String,
    version: String,
}

async fn health_check() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    if let Some(api_key) = &config.api_key {
        auth::init_api_key(api_key.clone());
        tracing::info!("operator API key authentication enabled");
    } else {
        tracing::warn!("no BOTGATE_API_KEY set - operator authentication disabled");
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("database migrations completed");

    let accounts = Arc::new(PgAccountRepository::new(pool.clone()));
    let menus = Arc::new(PgMenuRepository::new(pool.clone()));
    let messengers = Arc::new(PgMessengerRepository::new(pool.clone()));

    // Bot-author handlers are registered here, before the first dispatch;
    // the registry is immutable once the server starts serving.
    let registry = Arc::new(HandlerRegistry::with_builtins());

    let dispatcher = Arc::new(Dispatcher::new(accounts, menus, registry));
    let adapters = Arc::new(AdapterFactory::new());

    let state = AppState {
        messengers,
        dispatcher,
        adapters,
        public_url: config.public_url.clone(),
    };

    // Operator routes require authentication; webhook delivery does not
    // (it is authenticated by token hash + payload verification).
    let protected_routes = Router::new()
        .merge(routes::messenger::router())
        .layer(middleware::from_fn(auth::auth_middleware));

    let openapi = routes::swagger::ApiDoc::openapi();

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .route("/health", get(health_check))
        .merge(routes::webhook::router())
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, public_url = %config.public_url, "botgate listening");
    axum::serve(listener, router).await?;

    Ok(())
}
