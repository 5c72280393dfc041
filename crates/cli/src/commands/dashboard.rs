//! Dashboard server command.
//!
//! Builds the snapshot coordinator over the Schwab provider, runs one warm-up
//! refresh, starts the per-index refresh loops and serves the read-only web
//! API until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use gamma_core::config::MIN_REFRESH_SECONDS;
use gamma_core::GammaConfig;
use gamma_schwab::{SchwabClient, SchwabMarketData, SchwabVolatilityOracle};
use gamma_service::{RefreshScheduler, SnapshotCoordinator};
use gamma_web_api::ApiServer;
use tracing::{info, warn};

/// Arguments for the dashboard command.
#[derive(Args, Debug, Clone)]
pub struct DashboardArgs {
    /// Bind host (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Seconds between scheduled refreshes, minimum 5 (overrides config)
    #[arg(long)]
    pub refresh_seconds: Option<u64>,

    /// Index refreshed once before the server starts
    #[arg(long, default_value = "SPX")]
    pub warmup_index: String,

    /// Directory for the JSONL snapshot journal (overrides config)
    #[arg(long)]
    pub journal_dir: Option<PathBuf>,
}

impl DashboardArgs {
    fn apply(&self, mut config: GammaConfig) -> GammaConfig {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(secs) = self.refresh_seconds {
            config.service.refresh_seconds = secs;
        }
        if let Some(dir) = &self.journal_dir {
            config.service.journal_dir = Some(dir.clone());
        }
        config.normalized()
    }
}

/// Runs the dashboard command.
///
/// # Errors
/// Returns an error if the client or coordinator cannot be built or the
/// server fails to bind.
pub async fn run_dashboard(args: DashboardArgs, config: GammaConfig) -> Result<()> {
    if args.refresh_seconds.is_some_and(|s| s < MIN_REFRESH_SECONDS) {
        warn!(
            requested = ?args.refresh_seconds,
            minimum = MIN_REFRESH_SECONDS,
            "Refresh interval raised to minimum"
        );
    }
    let config = args.apply(config);

    let client = Arc::new(
        SchwabClient::from_config(&config.schwab).context("Failed to build Schwab client")?,
    );
    let coordinator = SnapshotCoordinator::builder(
        config.service.clone(),
        config.filters.clone(),
        Arc::new(SchwabMarketData::new(Arc::clone(&client))),
    )
    .with_oracle(Arc::new(SchwabVolatilityOracle::new(client)))
    .with_log_file(config.logging.file.clone())
    .build()?;

    info!(
        indices = ?coordinator.indices(),
        refresh_seconds = config.service.refresh_seconds,
        fast_mode = config.service.fast_mode,
        "Dashboard starting"
    );

    match coordinator.trigger_refresh(&args.warmup_index).await {
        Ok(snapshot) => info!(
            index = %snapshot.index,
            spot = ?snapshot.market.spot,
            action = %snapshot.strategy.tradeable.action,
            "Warm-up refresh complete"
        ),
        Err(e) => warn!(index = %args.warmup_index, error = %e, "Warm-up refresh failed; serving cold"),
    }

    let scheduler = RefreshScheduler::start(&coordinator);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let served = ApiServer::new(coordinator)
        .serve(&addr, shutdown_signal())
        .await;

    scheduler.shutdown().await;
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DashboardArgs {
        DashboardArgs {
            host: None,
            port: None,
            refresh_seconds: None,
            warmup_index: "SPX".to_string(),
            journal_dir: None,
        }
    }

    #[test]
    fn test_overrides_apply_and_normalize() {
        let args = DashboardArgs {
            host: Some("0.0.0.0".to_string()),
            port: Some(9000),
            refresh_seconds: Some(2),
            ..args()
        };
        let config = args.apply(GammaConfig::default());
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.service.refresh_seconds, MIN_REFRESH_SECONDS);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let config = args().apply(GammaConfig::default());
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.service.refresh_seconds, 12);
    }
}
