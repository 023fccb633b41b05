use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use marketplace_social::config::{Config, CorsConfig, LogFormat, StorageBackend};
use marketplace_social::handlers;
use marketplace_social::metrics::{self, MetricsMiddleware};
use marketplace_social::middleware::JwtVerifier;
use marketplace_social::repository::MemoryStore;
use marketplace_social::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn build_cors(config: &CorsConfig) -> Cors {
    let mut cors = Cors::default();
    for origin in config.origins() {
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

async fn build_state(config: &Config) -> Result<AppState> {
    match config.database.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Ok(AppState::with_memory(
                Arc::new(MemoryStore::permissive()),
                config,
            ))
        }
        StorageBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;

            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
                .connect(url)
                .await
                .context("Failed to connect to database")?;

            sqlx::query("SELECT 1")
                .execute(&pool)
                .await
                .context("Database connectivity check failed")?;
            info!("Database connection established");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            info!("Database migrations completed");

            Ok(AppState::with_postgres(pool, config))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing(LogFormat::from_env());

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            return Err(e);
        }
    };
    info!(
        env = %config.app.env,
        port = config.app.http_port,
        backend = ?config.database.backend,
        "Starting marketplace-social"
    );

    let state = web::Data::new(build_state(&config).await?);
    let verifier = Arc::new(JwtVerifier::new(&config.auth.jwt_secret));
    let cors_config = config.cors.clone();
    let bind_addr = format!("{}:{}", config.app.host, config.app.http_port);

    info!("HTTP server listening on http://{}", bind_addr);

    HttpServer::new(move || {
        let verifier = verifier.clone();
        App::new()
            .wrap(build_cors(&cors_config))
            .wrap(MetricsMiddleware)
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .route("/health", web::get().to(handlers::health))
            .route("/ready", web::get().to(handlers::ready))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(move |cfg| handlers::configure(cfg, verifier))
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind HTTP server to {}", bind_addr))?
    .run()
    .await
    .context("HTTP server error")?;

    info!("marketplace-social shut down");
    Ok(())
}
