mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod tracing_config;
mod utils;

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use config::Config;
use db::{DBClient, UserExt};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_config::init_tracing;

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub db_client: DBClient,
}

/// Create the configured admin account on first start.
/// Failures are logged; the server still starts.
async fn bootstrap_admin(config: &Config, db_client: &DBClient) {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return;
    };

    match db_client.get_user(None, None, Some(email.as_str())).await {
        Ok(Some(_)) => {
            tracing::debug!("Bootstrap admin already exists");
            return;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("DB error, looking up bootstrap admin: {}", e);
            return;
        }
    }

    let hash_password = match utils::password::hash(password.as_str()) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Bootstrap admin password rejected: {}", e);
            return;
        }
    };

    let username = email.split('@').next().unwrap_or("admin");
    match db_client.ensure_admin(username, email, &hash_password).await {
        Ok(true) => tracing::info!(email = %email, "Bootstrap admin created"),
        Ok(false) => tracing::warn!(email = %email, "Bootstrap admin skipped, username or email taken"),
        Err(e) => tracing::error!("DB error, creating bootstrap admin: {}", e),
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Keep the guard alive for the whole program, it flushes the log file
    let _guard = init_tracing();

    let config = match Config::init() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run migrations: {:?}", err);
        std::process::exit(1);
    }

    let frontend_origin = match config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(err) => {
            tracing::error!("Invalid FRONTEND_URL: {}", err);
            std::process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(frontend_origin)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    let db_client = DBClient::new(pool);

    bootstrap_admin(&config, &db_client).await;

    // scheduler
    if let Err(err) = db_client.start_expiry_task().await {
        tracing::error!("Failed to start the subscription expiry job: {:?}", err);
        std::process::exit(1);
    }

    let app_state = AppState {
        env: Arc::new(config.clone()),
        db_client,
    };

    let app = routes::create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
        std::process::exit(1);
    }
}
