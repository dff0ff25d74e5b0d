use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use social_feed_service::config::{Config, StorageBackend, StoreBackend};
use social_feed_service::middleware::{SessionMiddleware, SessionVerifier};
use social_feed_service::repository::{MemoryStore, Stores};
use social_feed_service::storage::{MemoryObjectStorage, ObjectStorage, S3ObjectStorage};
use social_feed_service::{configure, AppState};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(json: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn connect_stores(config: &Config) -> Result<Stores> {
    match config.database.backend {
        StoreBackend::Memory => {
            warn!("STORE_BACKEND=memory: data is not persisted");
            Ok(Stores::memory(Arc::new(MemoryStore::new())))
        }
        StoreBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .context("DATABASE_URL environment variable not set")?;

            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
                .connect(url)
                .await
                .context("Failed to connect to database")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            info!("Database pool created and migrations applied");

            Ok(Stores::postgres(pool))
        }
    }
}

async fn connect_storage(config: &Config) -> Arc<dyn ObjectStorage> {
    let base_url = config.storage.public_base_url.clone();
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("STORAGE_BACKEND=memory: uploads are not persisted");
            Arc::new(MemoryObjectStorage::new(base_url))
        }
        StorageBackend::S3 => Arc::new(S3ObjectStorage::from_env(base_url).await),
    }
}

fn build_cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default();
    for origin in allowed_origins.split(',') {
        let origin = origin.trim();
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else if !origin.is_empty() {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method().allow_any_header().max_age(3600)
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.app.json_logs);
    info!(
        env = %config.app.env,
        port = config.app.port,
        store = ?config.database.backend,
        storage = ?config.storage.backend,
        "Starting social-feed-service"
    );

    let stores = connect_stores(&config).await?;
    let storage = connect_storage(&config).await;
    let state = web::Data::new(AppState::new(stores, storage, config.feed.clone()));
    let verifier = Arc::new(SessionVerifier::new(
        &config.auth.jwt_secret,
        &config.auth.jwt_audience,
    ));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let cors_origins = config.app.cors_allowed_origins.clone();
    info!("HTTP server listening on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(SessionMiddleware::new(verifier.clone()))
            .wrap(build_cors(&cors_origins))
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(configure)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind HTTP server to {}", bind_address))?
    .run()
    .await
    .context("HTTP server error")?;

    info!("social-feed-service stopped");
    Ok(())
}
