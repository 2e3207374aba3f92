use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use vote_service::config::{Config, StorageBackend};
use vote_service::handlers::{self, AppState};
use vote_service::metrics;
use vote_service::middleware::IdentityMiddleware;
use vote_service::repository::{LedgerStore, MemoryStore, PgStore};

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,vote_service=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_state(config: &Config) -> Result<AppState> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; votes are lost on restart");
            Ok(AppState::from_store(Arc::new(MemoryStore::new())))
        }
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .as_deref()
                .context("DATABASE_URL environment variable not set")?;

            let pool = PgPoolOptions::new()
                .max_connections(config.storage.max_connections)
                .min_connections(config.storage.min_connections)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
                .connect(url)
                .await
                .context("Failed to connect to database")?;
            info!("Database pool created");

            let store = PgStore::new(pool);
            store
                .migrate()
                .await
                .context("Failed to run database migrations")?;
            info!("Database migrations completed");

            let repaired = store
                .reconcile_vote_counts()
                .await
                .context("Failed to reconcile vote counts")?;
            if repaired > 0 {
                warn!(repaired, "Repaired drifted vote counts from the ledger");
            }

            Ok(AppState::from_store(Arc::new(store)))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(config.app.json_logs);

    info!(
        env = %config.app.env,
        http_port = config.app.http_port,
        storage = ?config.storage.backend,
        "Starting vote-service"
    );
    if config.auth.uses_dev_secret() {
        warn!("JWT_SECRET not set, using development secret");
    }

    let state = build_state(&config).await?;
    let jwt_secret = config.auth.jwt_secret.clone();
    let http_addr = format!("{}:{}", config.app.host, config.app.http_port);

    info!("Listening on http://{}", http_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(IdentityMiddleware::new(&jwt_secret))
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::configure)
    })
    .bind(&http_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    info!("vote-service stopped");
    Ok(())
}
