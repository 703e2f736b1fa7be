use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use voya_api_rust::config::AppConfig;
use voya_api_rust::database::connector_from_url;
use voya_api_rust::{app, AppState, DEFAULT_LOG_FILTER};

#[derive(Parser)]
#[command(name = "voya-api")]
#[command(about = "Voya API gateway - shared-token access to user, book and uuid bridge documents")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Port to listen on (overrides VOYA_API_PORT / PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Host to bind (overrides VOYA_API_HOST)")]
    host: Option<String>,

    #[arg(long, help = "Store URL, postgres:// or memory:// (overrides DATABASE_URL)")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, VOYA_AUTH_TOKEN, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.api.port = port;
    }
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(url) = cli.database_url {
        config.database.url = Some(url);
    }

    tracing::info!("Starting Voya API in {:?} mode", config.environment);
    if config.security.auth_token.is_none() {
        tracing::warn!("VOYA_AUTH_TOKEN is not set; every data request will be rejected");
    }

    let store = connector_from_url(config.store_url()).context("failed to configure store")?;
    let bind_addr = config.bind_addr();
    let state = AppState::new(config, store);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Voya API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
