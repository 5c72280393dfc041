//! Nested option chain → flat per-contract rows.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use gamma_core::{FlattenedOptionRow, OptionType, RawContract, RawOptionChain};
use rust_decimal::Decimal;
use tracing::debug;

/// Row identity: one expiration's contract of a given type at a given strike.
type RowKey = (Decimal, OptionType, Option<NaiveDate>, i64);

/// Flattens a raw chain into one row per `(expiration, strike, option_type)`.
///
/// Records without a finite gamma and a finite, non-negative open interest
/// are dropped, as are strikes that do not parse to a positive number.
/// Duplicates within one expiration keep the last one seen, walking strikes
/// and contracts in input order. Rows from different expirations are all
/// kept; exposure is summed per strike downstream. Output is sorted by
/// strike, calls before puts, then by expiration. Never fails.
#[must_use]
pub fn flatten_chain(chain: &RawOptionChain) -> Vec<FlattenedOptionRow> {
    let mut rows: BTreeMap<RowKey, FlattenedOptionRow> = BTreeMap::new();
    let mut dropped = 0usize;

    for expiration in &chain.expirations {
        let expiry = expiration.expiry();
        let dte = expiration.dte();

        for raw_strike in &expiration.strikes {
            let Some(strike) = parse_strike(&raw_strike.strike_key) else {
                dropped += raw_strike.calls.len() + raw_strike.puts.len();
                continue;
            };

            let sides = [
                (OptionType::Call, &raw_strike.calls),
                (OptionType::Put, &raw_strike.puts),
            ];
            for (option_type, contracts) in sides {
                for contract in contracts {
                    match usable_row(contract, strike, option_type) {
                        Some(mut row) => {
                            row.expiry = expiry;
                            row.dte = dte;
                            rows.insert((strike, option_type, expiry, dte), row);
                        }
                        None => dropped += 1,
                    }
                }
            }
        }
    }

    if dropped > 0 {
        debug!(dropped, kept = rows.len(), "Dropped unusable chain records");
    }
    rows.into_values().collect()
}

fn parse_strike(key: &str) -> Option<Decimal> {
    let strike = Decimal::from_str(key.trim()).ok()?;
    (strike > Decimal::ZERO).then(|| strike.normalize())
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn usable_row(
    contract: &RawContract,
    strike: Decimal,
    option_type: OptionType,
) -> Option<FlattenedOptionRow> {
    let gamma = finite(contract.gamma)?;
    let open_interest = finite(contract.open_interest).filter(|oi| *oi >= 0.0)?;

    Some(FlattenedOptionRow {
        strike,
        option_type,
        open_interest,
        volume: finite(contract.volume).unwrap_or(0.0).max(0.0),
        implied_vol: finite(contract.implied_vol).filter(|iv| *iv > 0.0),
        gamma: Some(gamma),
        delta: finite(contract.delta),
        mark: contract.mark_price(),
        symbol: contract.symbol.clone(),
        expiry: None,
        dte: 0,
    })
}
