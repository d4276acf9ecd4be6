use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use clariox_api::app::{app, AppState};
use clariox_api::config::{AppConfig, DEFAULT_JWT_SECRET};
use clariox_api::database::{schema, DatabaseManager, PgPostRepository, PgUserRepository};

#[derive(Parser)]
#[command(name = "clariox-api")]
#[command(about = "Clariox AI backend API server")]
#[command(version)]
struct Args {
    #[arg(long, help = "Bind address (overrides HOST)")]
    host: Option<String>,

    #[arg(long, help = "Listen port (overrides PORT)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("clariox_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate().context("invalid configuration")?;

    tracing::info!("Starting Clariox API in {:?} mode", config.environment);
    if config.security.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("SECRET_KEY is not set; using the insecure development secret");
    }
    if config.completion.api_key.is_empty() {
        tracing::warn!("GROQ_API_KEY is not set; /api/ai/generate will fail upstream");
    }

    let pool = DatabaseManager::connect_lazy(&config.database)?;

    let state = AppState::new(
        &config,
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgPostRepository::new(pool.clone())),
    )?;

    // Bootstrap in the background so the listener comes up even when the database is down
    let bootstrap_pool = pool.clone();
    let schema_ready = state.schema_ready.clone();
    tokio::spawn(async move {
        schema::bootstrap_schema(bootstrap_pool, &schema_ready).await;
    });

    let router = app(state, &config);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Clariox API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    DatabaseManager::close(&pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
