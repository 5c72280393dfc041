//! Trade setup and tradeability decision for the GEX dashboard.
//!
//! - [`setup`]: candidate structure (iron condor or directional credit spread) from spot and pin
//! - [`checks`]: fixed-order rule chain and the final TRADE / NO_TRADE decision
//! - [`evaluate`]: ties the above together into a snapshot's strategy block

pub mod checks;
pub mod evaluate;
pub mod setup;

pub use checks::{decide, run_checks, CheckContext, External, CHECK_NAMES};
pub use evaluate::{StrategyEvaluator, StrategyInputs};
pub use setup::build_setup;
