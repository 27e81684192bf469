//! # Amount Conversion
//!
//! Conversion between the display unit (SUI) and the ledger's smallest
//! integer unit (MIST), plus pool share percentages.

use crate::{error::Result, MarketError};

/// Smallest units per display unit (1 SUI = 10^9 MIST)
pub const MIST_PER_SUI: u64 = 1_000_000_000;

/// Convert a display amount to smallest units, truncating toward zero.
///
/// Non-finite or negative input must be rejected by the caller beforehand,
/// see [`parse_stake`].
pub fn to_smallest_unit(amount: f64) -> u64 {
    (amount * MIST_PER_SUI as f64) as u64
}

/// Convert smallest units to a display amount. Presentation only.
pub fn to_display_unit(mist: u64) -> f64 {
    mist as f64 / MIST_PER_SUI as f64
}

/// Format smallest units as a display amount with two decimals
pub fn format_display(mist: u64) -> String {
    format!("{:.2}", to_display_unit(mist))
}

/// Validate a stake given in display units and convert it to smallest units.
///
/// Fails when the amount is not finite, not positive, or truncates to zero.
pub fn parse_stake(amount: f64) -> Result<u64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(MarketError::InvalidInput(format!(
            "Bet amount must be a positive number, got {amount}"
        )));
    }
    let mist = to_smallest_unit(amount);
    if mist == 0 {
        return Err(MarketError::InvalidInput(format!(
            "Bet amount {amount} is below the smallest unit"
        )));
    }
    Ok(mist)
}

/// Share of each side of the pool in percent.
///
/// Returns `(0.0, 0.0)` for an empty pool. Otherwise the no side is derived
/// from the yes side so both always sum to exactly 100.
pub fn pool_percentages(yes_pool: u64, no_pool: u64) -> (f64, f64) {
    let total = yes_pool as f64 + no_pool as f64;
    if total == 0.0 {
        return (0.0, 0.0);
    }
    let yes_pct = 100.0 * yes_pool as f64 / total;
    (yes_pct, 100.0 - yes_pct)
}
