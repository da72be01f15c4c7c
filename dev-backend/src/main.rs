//! WAF Dashboard Development Backend - entry point

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waf_dev_backend::{AppState, Config, TrafficGenerator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging (LOG_FORMAT=json for structured output)
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "waf_dev_backend=debug,tower_http=debug".into()));
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Load configuration
    let config = Config::from_env();

    tracing::info!("WAF dev backend starting...");

    // Seed fixtures
    let state = AppState::new(config.clone());
    let seeded = state.seed(&mut TrafficGenerator::from_entropy());
    tracing::info!("Seeded {} log records", seeded);

    if let Some(interval) = config.generate_traffic {
        tracing::info!("Generating traffic every {:?}", interval);
        waf_dev_backend::spawn_traffic(state.clone(), interval);
    }

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    waf_dev_backend::serve(listener, state).await?;
    Ok(())
}
