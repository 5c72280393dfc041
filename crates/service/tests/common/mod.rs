#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gamma_core::{
    FilterConfig, IndexProfile, MarketData, MarketDataProvider, MarketQuote, RawContract,
    RawExpiration, RawOptionChain, RawStrike, RefreshError, ServiceConfig,
};

/// Provider returning a fixed SPX-like chain, counting calls.
pub struct MockProvider {
    calls: AtomicUsize,
    delay: Duration,
    failing: AtomicBool,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            failing: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn fetch(&self, profile: &IndexProfile) -> Result<MarketData, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RefreshError::transient("HTTP 503 from quotes"));
        }
        Ok(MarketData {
            quote: MarketQuote {
                symbol: profile.index_symbol.clone(),
                spot: Some(6010.0),
                vix: Some(18.0),
                quote_time: None,
            },
            chain: sample_chain(),
            momentum: None,
            warnings: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn sample_chain() -> RawOptionChain {
    let strikes = vec![
        RawStrike::new("5990.0").with_put(RawContract::with_greeks(0.004, 3000.0)),
        RawStrike::new("6000.0")
            .with_call(RawContract::with_greeks(0.005, 1500.0))
            .with_put(RawContract::with_greeks(0.005, 1400.0)),
        RawStrike::new("6020.0").with_call(RawContract::with_greeks(0.003, 2500.0)),
    ];
    RawOptionChain::new("$SPX", vec![RawExpiration::new("2026-02-10:0", strikes)])
}

pub fn service_config(indices: &[&str]) -> ServiceConfig {
    ServiceConfig {
        refresh_seconds: 12,
        indices: indices.iter().map(|s| (*s).to_string()).collect(),
        ..ServiceConfig::default()
    }
}

pub fn filters() -> FilterConfig {
    FilterConfig::default()
}
