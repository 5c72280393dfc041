//! Core types, traits and configuration for the gamma-exposure engine.
//!
//! This crate is the shared kernel of the workspace:
//! - Data model for option chains, GEX structures, strategy decisions and snapshots
//! - Error taxonomy for the refresh pipeline
//! - Collaborator traits (market data, volatility lookups, clock)
//! - Static per-index profiles and runtime configuration

pub mod chain;
pub mod clock;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod gex;
pub mod profile;
pub mod snapshot;
pub mod strategy;
pub mod traits;

pub use chain::{FlattenedOptionRow, OptionType, RawContract, RawExpiration, RawOptionChain, RawStrike};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    FilterConfig, GammaConfig, LoggingConfig, SchwabConfig, ServerConfig, ServiceConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{RefreshError, SnapshotError};
pub use events::{DebugEvent, DebugEventKind, EventLevel};
pub use gex::{DirectionBias, GexLevel, GexSide, GexStructure, Observation, SignalSummary};
pub use profile::IndexProfile;
pub use snapshot::{ContractCard, MarketSection, OptionsSummary, Snapshot, SystemStatus};
pub use strategy::{
    CheckStatus, MarketInputs, StrategyCore, StrategyKind, StrategyMeta, StrategySection,
    TradeAction, TradeabilityCheck, TradeableDecision,
};
pub use traits::{
    Candle, MarketData, MarketDataProvider, MarketQuote, MomentumInputs, RangeReading,
    VolatilityOracle,
};
