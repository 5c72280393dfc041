//! CLI commands for the gamma-exposure engine.

pub mod dashboard;
pub mod signal;

pub use dashboard::{run_dashboard, DashboardArgs};
pub use signal::{run_signal, SignalArgs};
