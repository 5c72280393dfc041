//! Schwab market-data integration for the gamma-exposure engine.
//!
//! This crate provides:
//! - OAuth access-token refresh with refresh-token rotation
//! - REST client for quotes, option chains and price history
//! - Lenient decoding of upstream payloads into the core chain schema
//! - [`SchwabMarketData`] and [`SchwabVolatilityOracle`] collaborators
//!
//! # Authentication
//!
//! Set the following environment variables (names are configurable):
//!
//! - `SCHWAB_CLIENT_ID` / `SCHWAB_CLIENT_SECRET`: app credentials
//! - `SCHWAB_REFRESH_TOKEN`: long-lived refresh token
//! - `SCHWAB_ACCESS_TOKEN`: optional seed token, used until rejected
//!
//! The client is read-only; it never touches trading endpoints.

pub mod auth;
pub mod client;
pub mod error;
pub mod parse;
pub mod provider;

pub use auth::{SchwabAuth, SchwabCredentials};
pub use client::{PriceHistoryQuery, SchwabClient, SchwabClientConfig};
pub use error::{Result, SchwabError};
pub use provider::{SchwabMarketData, SchwabVolatilityOracle, VIX_SYMBOL};
