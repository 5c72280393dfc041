//! Read-only trade signal for one index.
//!
//! Runs the same pipeline the dashboard uses, once or on a fixed interval, and
//! prints the verdict. Nothing here places orders.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Args;
use gamma_core::{GammaConfig, IndexProfile, MarketDataProvider, Snapshot};
use gamma_schwab::{SchwabClient, SchwabMarketData, SchwabVolatilityOracle};
use gamma_service::SnapshotPipeline;
use gamma_strategy::StrategyEvaluator;
use tracing::{error, info};

/// Arguments for the signal command.
#[derive(Args, Debug, Clone)]
pub struct SignalArgs {
    /// Index code (SPX or NDX)
    #[arg(default_value = "SPX")]
    pub index: String,

    /// Re-evaluate on an interval until Ctrl-C
    #[arg(long)]
    pub watch: bool,

    /// Seconds between evaluations in watch mode
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(5..))]
    pub interval: u64,

    /// Print the full snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

/// Runs the signal command.
///
/// # Errors
/// Returns an error for an unsupported index, or when a single-shot fetch
/// fails. In watch mode fetch errors are logged and the loop continues.
pub async fn run_signal(args: SignalArgs, config: GammaConfig) -> Result<()> {
    let config = config.normalized();
    let profile = IndexProfile::for_code(&args.index)
        .ok_or_else(|| anyhow!("Unsupported index: {}", args.index))?;

    let client = Arc::new(SchwabClient::from_config(&config.schwab)?);
    let provider = SchwabMarketData::new(Arc::clone(&client));
    let evaluator = StrategyEvaluator::new(config.filters.clone())
        .with_fast_mode(config.service.fast_mode)
        .with_warn_penalty(config.service.warn_penalty)
        .with_oracle(Arc::new(SchwabVolatilityOracle::new(client)));
    let pipeline = SnapshotPipeline::new(evaluator, config.service.top_levels);

    if !args.watch {
        let snapshot = evaluate_once(&pipeline, &provider, &profile).await?;
        print_snapshot(&snapshot, args.json)?;
        return Ok(());
    }

    info!(index = %profile.code, interval = args.interval, "Watching signal");
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match evaluate_once(&pipeline, &provider, &profile).await {
                    Ok(snapshot) => print_snapshot(&snapshot, args.json)?,
                    Err(e) => error!(index = %profile.code, error = %e, "Signal evaluation failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Signal watch stopped");
                return Ok(());
            }
        }
    }
}

async fn evaluate_once(
    pipeline: &SnapshotPipeline,
    provider: &dyn MarketDataProvider,
    profile: &IndexProfile,
) -> Result<Snapshot> {
    let data = provider.fetch(profile).await?;
    Ok(pipeline.build(profile, data, Utc::now()).await)
}

fn print_snapshot(snapshot: &Snapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    } else {
        println!("{}", format_signal(snapshot));
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.decimals$}"))
}

/// Human-readable signal block.
pub fn format_signal(snapshot: &Snapshot) -> String {
    let strategy = &snapshot.strategy;
    let inputs = &strategy.market_inputs;
    let core = &strategy.core;
    let decision = &strategy.tradeable;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} signal @ {} (read-only, never places orders)",
        snapshot.index, strategy.meta.generated_at_et
    );
    let _ = writeln!(
        out,
        "  spot {}  vix {}  pin {}  distance {}",
        fmt_opt(inputs.index_price, 2),
        fmt_opt(inputs.vix, 2),
        fmt_opt(inputs.pin_price, 0),
        fmt_opt(core.distance, 2),
    );
    let _ = writeln!(
        out,
        "  rsi {:.1}  down days {}  gap {:.2}%  2h move {}",
        inputs.rsi,
        inputs.consecutive_down_days,
        inputs.gap_pct,
        fmt_opt(inputs.expected_move_2h, 2),
    );

    let _ = write!(out, "  observation {}", snapshot.signals.observation);
    if !snapshot.signals.reasons.is_empty() {
        let _ = write!(out, ": {}", snapshot.signals.reasons.join("; "));
    }
    out.push('\n');

    let strikes = core
        .strikes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/");
    let _ = writeln!(
        out,
        "  setup {} [{}] confidence {:.2}",
        core.kind,
        if strikes.is_empty() { "-" } else { &strikes },
        core.confidence,
    );
    let _ = writeln!(
        out,
        "  {} ({}) score {:.2}",
        decision.action, decision.primary_reason, decision.decision_score
    );

    for reason in decision.blocking_reasons() {
        let _ = writeln!(out, "    blocked: {reason}");
    }
    for check in strategy.checks.iter().filter(|c| c.is_warning()) {
        let _ = writeln!(out, "    warn: {} {}", check.name, check.reason);
    }
    for warning in &strategy.meta.warnings {
        let _ = writeln!(out, "    note: {warning}");
    }
    out.trim_end().to_string()
}
