//! Lenient decoding of Schwab market-data payloads.
//!
//! Upstream shapes drift between endpoints and symbols: numbers arrive as
//! JSON numbers or numeric strings, buckets may be keyed with or without the
//! `$` index prefix, and fields come and go. Nothing here fails; unusable
//! values become `None` and the analytics layer decides what to keep.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use gamma_core::{Candle, RawContract, RawExpiration, RawOptionChain, RawStrike};
use serde_json::Value;

/// Price fields tried in order; the first positive value wins.
const PRICE_KEYS: [&str; 6] = ["lastPrice", "last", "mark", "closePrice", "bidPrice", "askPrice"];

/// Finite number from a JSON number or numeric string.
#[must_use]
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn field(object: &Value, key: &str) -> Option<f64> {
    object.get(key).and_then(number)
}

/// Quote bucket for `symbol` in a quotes response, trying the bare symbol
/// when the `$`-prefixed key is absent.
#[must_use]
pub fn quote_bucket<'a>(quotes: &'a Value, symbol: &str) -> Option<&'a Value> {
    let bare = symbol.trim_start_matches('$');
    [symbol, bare]
        .into_iter()
        .find_map(|key| quotes.get(key))
        .filter(|bucket| bucket.is_object())
}

/// Last usable price, searching the bucket and its nested `quote` object.
#[must_use]
pub fn quote_price(bucket: &Value) -> Option<f64> {
    let nested = bucket.get("quote").filter(|q| q.is_object());
    [Some(bucket), nested]
        .into_iter()
        .flatten()
        .find_map(|b| {
            PRICE_KEYS
                .iter()
                .filter_map(|key| field(b, key))
                .find(|price| *price > 0.0)
        })
}

/// Quote timestamp from `quoteTime`/`tradeTime` epoch milliseconds.
#[must_use]
pub fn quote_time(bucket: &Value) -> Option<DateTime<Utc>> {
    let nested = bucket.get("quote").filter(|q| q.is_object());
    [Some(bucket), nested]
        .into_iter()
        .flatten()
        .flat_map(|b| ["quoteTime", "tradeTime"].map(|key| field(b, key)))
        .flatten()
        .find(|ms| *ms > 0.0)
        .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
}

/// True when the chain response carries no contract maps worth parsing.
#[must_use]
pub fn chain_has_contracts(chain: &Value) -> bool {
    ["callExpDateMap", "putExpDateMap"].iter().any(|key| {
        chain
            .get(*key)
            .and_then(Value::as_object)
            .is_some_and(|m| !m.is_empty())
    })
}

/// Builds the nested raw chain from `callExpDateMap`/`putExpDateMap`.
///
/// Expirations and strikes from the two maps are merged by key. Anything
/// that is not the expected object/array shape is skipped.
#[must_use]
pub fn option_chain(chain: &Value) -> RawOptionChain {
    let mut expirations: BTreeMap<String, BTreeMap<String, RawStrike>> = BTreeMap::new();

    for (map_key, is_call) in [("callExpDateMap", true), ("putExpDateMap", false)] {
        let Some(side) = chain.get(map_key).and_then(Value::as_object) else {
            continue;
        };
        for (exp_key, strikes) in side {
            let Some(strikes) = strikes.as_object() else {
                continue;
            };
            let by_strike = expirations.entry(exp_key.clone()).or_default();
            for (strike_key, contracts) in strikes {
                let Some(contracts) = contracts.as_array() else {
                    continue;
                };
                let strike = by_strike
                    .entry(strike_key.clone())
                    .or_insert_with(|| RawStrike::new(strike_key.clone()));
                let parsed = contracts.iter().filter(|c| c.is_object()).map(contract);
                if is_call {
                    strike.calls.extend(parsed);
                } else {
                    strike.puts.extend(parsed);
                }
            }
        }
    }

    RawOptionChain {
        symbol: chain.get("symbol").and_then(Value::as_str).map(str::to_string),
        expirations: expirations
            .into_iter()
            .map(|(key, strikes)| RawExpiration::new(key, strikes.into_values().collect()))
            .collect(),
    }
}

fn contract(c: &Value) -> RawContract {
    RawContract {
        symbol: c.get("symbol").and_then(Value::as_str).map(str::to_string),
        bid: field(c, "bid"),
        ask: field(c, "ask"),
        last: field(c, "last"),
        mark: field(c, "mark"),
        delta: field(c, "delta"),
        gamma: field(c, "gamma"),
        theta: field(c, "theta"),
        vega: field(c, "vega"),
        implied_vol: field(c, "volatility").or_else(|| field(c, "iv")),
        open_interest: field(c, "openInterest"),
        volume: field(c, "totalVolume").or_else(|| field(c, "volume")),
    }
}

/// Candles from a price-history response, oldest first. Bars missing any
/// OHLC value or timestamp are dropped.
#[must_use]
pub fn candles(history: &Value) -> Vec<Candle> {
    let Some(bars) = history.get("candles").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut out: Vec<Candle> = bars
        .iter()
        .filter_map(|bar| {
            let time = field(bar, "datetime")
                .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())?;
            Some(Candle {
                time,
                open: field(bar, "open")?,
                high: field(bar, "high")?,
                low: field(bar, "low")?,
                close: field(bar, "close")?,
                volume: field(bar, "volume").unwrap_or(0.0),
            })
        })
        .collect();
    out.sort_by_key(|c| c.time);
    out
}
