//! WAF Dashboard - headless entry point
//!
//! Runs one dashboard session against the configured backend and logs a
//! summary line whenever the view changes.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waf_dashboard_core::constants::{APP_NAME, APP_VERSION};
use waf_dashboard_core::{DashboardConfig, DashboardSnapshot, DashboardStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waf_dashboard_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DashboardConfig::from_env().context("invalid dashboard configuration")?;
    tracing::info!("{} v{} starting against {}", APP_NAME, APP_VERSION, config.api_url);

    let store = DashboardStore::start(&config).context("failed to start dashboard session")?;
    let mut revisions = store.subscribe();

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                log_snapshot(&store.snapshot());
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, shutting down");
                break;
            }
        }
    }

    store.shutdown().await;
    Ok(())
}

fn log_snapshot(snapshot: &DashboardSnapshot) {
    let summary = &snapshot.summary;
    tracing::info!(
        revision = snapshot.revision,
        logs = summary.total_logs,
        attacks = summary.attack_logs,
        anomalous_ips = snapshot.anomalous_ips.len(),
        origins = snapshot.attack_origins.len(),
        timeline_attacks = summary.timeline_attacks,
        prevention = ?snapshot.prevention_enabled,
        paused = snapshot.polling_paused,
        "dashboard updated"
    );

    if let Some(error) = &snapshot.error {
        tracing::warn!(failures = snapshot.consecutive_failures, "log feed error: {}", error);
    }
    for (feed, status) in &snapshot.feeds {
        if let (false, Some(error)) = (feed.is_primary(), &status.error) {
            tracing::warn!(feed = feed.name(), "{}", error);
        }
    }
}
