use std::collections::BTreeSet;

use gamma_core::{ContractCard, FlattenedOptionRow, OptionType, OptionsSummary, RawOptionChain};

const NEAREST_EXPIRY_COUNT: usize = 5;
pub const TOP_CONTRACT_COUNT: usize = 10;

/// Aggregates open interest, volume, IV and greeks across the flattened rows,
/// and picks the most-traded and most-held contracts.
#[must_use]
pub fn summarize_options(chain: &RawOptionChain, rows: &[FlattenedOptionRow]) -> OptionsSummary {
    let mut summary = OptionsSummary {
        raw_contract_count: chain.contract_count(),
        row_count: rows.len(),
        ..OptionsSummary::default()
    };

    let mut iv_sum = 0.0;
    let mut iv_count = 0usize;
    for row in rows {
        match row.option_type {
            OptionType::Call => {
                summary.call_open_interest += row.open_interest;
                summary.call_volume += row.volume;
            }
            OptionType::Put => {
                summary.put_open_interest += row.open_interest;
                summary.put_volume += row.volume;
            }
        }
        if let Some(iv) = row.implied_vol {
            iv_sum += iv;
            iv_count += 1;
        }
    }

    summary.put_call_oi_ratio = ratio(summary.put_open_interest, summary.call_open_interest);
    summary.put_call_volume_ratio = ratio(summary.put_volume, summary.call_volume);
    summary.avg_implied_vol = (iv_count > 0).then(|| round4(iv_sum / iv_count as f64));
    summary.avg_abs_delta = mean_abs(rows.iter().filter_map(|r| r.delta)).map(round4);
    summary.avg_abs_gamma = mean_abs(rows.iter().filter_map(|r| r.gamma)).map(round6);
    summary.top_volume_contracts = top_contracts(rows, |r| r.volume);
    summary.top_open_interest_contracts = top_contracts(rows, |r| r.open_interest);

    let expiries: BTreeSet<_> = chain.expirations.iter().filter_map(|e| e.expiry()).collect();
    summary.nearest_expiries = expiries.into_iter().take(NEAREST_EXPIRY_COUNT).collect();

    summary
}

/// Mean of |v| over the non-zero values.
fn mean_abs(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .filter(|v| *v != 0.0 && v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v.abs(), count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Highest `key` first; equal keys keep row order.
fn top_contracts(rows: &[FlattenedOptionRow], key: impl Fn(&FlattenedOptionRow) -> f64) -> Vec<ContractCard> {
    let mut ranked: Vec<&FlattenedOptionRow> = rows.iter().collect();
    ranked.sort_by(|a, b| key(b).total_cmp(&key(a)));
    ranked
        .into_iter()
        .take(TOP_CONTRACT_COUNT)
        .map(ContractCard::from)
        .collect()
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then(|| round4(numerator / denominator))
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
