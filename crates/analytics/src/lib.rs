//! Chain analytics for the gamma-exposure engine.
//!
//! - [`flatten_chain`]: nested raw chain → one row per `(expiration, strike, type)`
//! - [`GexCalculator`]: rows + spot → pin, walls and top levels
//! - [`summarize_options`]: open interest, volume, IV and greek aggregates, top contracts
//! - [`build_signal_summary`]: observation and reasons for display
//! - [`indicators`]: RSI, down-day streak, gap, expected move, intraday range

pub mod flatten;
pub mod gex;
pub mod indicators;
pub mod signals;
pub mod summary;

pub use flatten::flatten_chain;
pub use gex::{direction_bias, GexCalculator};
pub use signals::build_signal_summary;
pub use summary::summarize_options;
