use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Lowest refresh cadence the service accepts.
pub const MIN_REFRESH_SECONDS: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GammaConfig {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub schwab: SchwabConfig,
    pub filters: FilterConfig,
    pub logging: LoggingConfig,
}

impl GammaConfig {
    /// Applies floors and canonical casing after loading.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.service = self.service.normalized();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub refresh_seconds: u64,
    /// Skip checks that need extra upstream lookups.
    pub fast_mode: bool,
    pub staleness_multiplier: f64,
    pub top_levels: usize,
    pub history_capacity: usize,
    pub history_limit_max: usize,
    /// Score deducted per non-blocking warning.
    pub warn_penalty: f64,
    pub indices: Vec<String>,
    /// Directory for the daily JSONL snapshot journal. Disabled when unset.
    pub journal_dir: Option<PathBuf>,
}

impl ServiceConfig {
    /// Floors the refresh interval at [`MIN_REFRESH_SECONDS`], replaces a
    /// non-positive staleness multiplier with the default and uppercases the
    /// index codes.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.refresh_seconds = self.refresh_seconds.max(MIN_REFRESH_SECONDS);
        self.staleness_multiplier =
            if self.staleness_multiplier.is_finite() && self.staleness_multiplier > 0.0 {
                self.staleness_multiplier
            } else {
                ServiceConfig::default().staleness_multiplier
            };
        self.history_capacity = self.history_capacity.max(1);
        self.history_limit_max = self.history_limit_max.max(1);
        self.warn_penalty = self.warn_penalty.clamp(0.0, 1.0);
        self.indices = self
            .indices
            .iter()
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_seconds)
    }

    /// Age in seconds past which a snapshot is reported stale.
    #[must_use]
    pub fn stale_after_seconds(&self) -> f64 {
        self.staleness_multiplier * self.refresh_seconds as f64
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            refresh_seconds: 12,
            fast_mode: true,
            staleness_multiplier: 2.0,
            top_levels: 8,
            history_capacity: 500,
            history_limit_max: 1000,
            warn_penalty: 0.05,
            indices: vec!["SPX".to_string(), "NDX".to_string()],
            journal_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Upstream endpoints and the names of the env vars holding credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchwabConfig {
    pub api_base_url: String,
    pub token_url: String,
    pub timeout_secs: u64,
    pub strike_count: u32,
    pub client_id_env: String,
    pub client_secret_env: String,
    pub refresh_token_env: String,
    pub access_token_env: String,
}

impl Default for SchwabConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.schwabapi.com".to_string(),
            token_url: "https://api.schwabapi.com/v1/oauth/token".to_string(),
            timeout_secs: 20,
            strike_count: 60,
            client_id_env: "SCHWAB_CLIENT_ID".to_string(),
            client_secret_env: "SCHWAB_CLIENT_SECRET".to_string(),
            refresh_token_env: "SCHWAB_REFRESH_TOKEN".to_string(),
            access_token_env: "SCHWAB_ACCESS_TOKEN".to_string(),
        }
    }
}

/// Entry filter thresholds. Hours are US/Eastern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub entry_cutoff_hour: u32,
    pub absolute_cutoff_hour: u32,
    /// Entries before this hour are blacked out.
    pub window_start_hour: u32,
    /// Entries at or after this hour are blacked out.
    pub window_end_hour: u32,
    pub vix_floor: f64,
    /// Max VIX rise over the last completed 5-minute bar, percent.
    pub vix_spike_pct: f64,
    pub realized_vol_ratio: f64,
    pub realized_vol_lookback_minutes: u32,
    pub rsi_min: f64,
    pub rsi_max: f64,
    pub skip_friday: bool,
    pub max_consecutive_down_days: u32,
    pub max_gap_pct: f64,
    /// Expected-move floor for a 5-wide spread; scaled by `base_spread_width / 5`.
    pub min_expected_move_base: f64,
    pub max_quote_age_seconds: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            entry_cutoff_hour: 13,
            absolute_cutoff_hour: 15,
            window_start_hour: 10,
            window_end_hour: 12,
            vix_floor: 13.0,
            vix_spike_pct: 5.0,
            realized_vol_ratio: 2.5,
            realized_vol_lookback_minutes: 30,
            rsi_min: 40.0,
            rsi_max: 80.0,
            skip_friday: false,
            max_consecutive_down_days: 5,
            max_gap_pct: 0.5,
            min_expected_move_base: 10.0,
            max_quote_age_seconds: 300.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
