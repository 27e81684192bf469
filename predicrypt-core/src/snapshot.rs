//! Fetched market state and the per-market values derived from it for display.

use serde::{Deserialize, Serialize};

use crate::{
    market::{Bet, Market, MarketState},
    units,
    utils::format_countdown,
};

/// Markets and bets of one identity as read in a single refresh.
///
/// Disposable: valid until the next fetch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MarketSnapshot {
    /// Identity the snapshot was fetched for
    pub owner: String,
    pub markets: Vec<Market>,
    pub bets: Vec<Bet>,
    /// Local time of the fetch in Unix milliseconds
    pub fetched_at: u64,
}

/// Derived fields of one market for one viewer at one instant
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MarketView<'a> {
    pub market: &'a Market,
    pub state: MarketState,
    pub yes_pct: f64,
    pub no_pct: f64,
    /// Total pool in display units, two decimals
    pub total_pool: String,
    /// `"{d}d {h}h {m}m"` or `"Ended"`
    pub countdown: String,
    pub can_bet: bool,
    pub can_resolve: bool,
    /// The viewer's bets that may claim on this market
    pub claimable: Vec<&'a Bet>,
    /// Sum of advisory payouts over `claimable`
    pub estimated_winnings: u64,
}

impl<'a> MarketView<'a> {
    pub fn new(market: &'a Market, bets: &'a [Bet], viewer: &str, now_ms: u64) -> Self {
        let (yes_pct, no_pct) = market.pool_percentages();
        let claimable = market.winning_bets(bets);
        let estimated_winnings = claimable
            .iter()
            .filter_map(|bet| market.estimated_payout(bet))
            .fold(0u64, u64::saturating_add);

        Self {
            market,
            state: market.state_at(now_ms),
            yes_pct,
            no_pct,
            total_pool: units::format_display(market.total_pool()),
            countdown: format_countdown(market.end_timestamp, now_ms),
            can_bet: market.can_bet(now_ms),
            can_resolve: market.can_resolve(viewer, now_ms),
            claimable,
            estimated_winnings,
        }
    }
}

impl MarketSnapshot {
    pub fn new(owner: String, markets: Vec<Market>, bets: Vec<Bet>, fetched_at: u64) -> Self {
        Self {
            owner,
            markets,
            bets,
            fetched_at,
        }
    }

    pub fn market(&self, id: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.id.eq_ignore_ascii_case(id))
    }

    /// Bets placed on market `id`
    pub fn bets_for(&self, id: &str) -> Vec<&Bet> {
        self.bets
            .iter()
            .filter(|b| b.market_id.eq_ignore_ascii_case(id))
            .collect()
    }

    /// Views of every market for the snapshot's owner at `now_ms`
    pub fn views(&self, now_ms: u64) -> Vec<MarketView<'_>> {
        self.markets
            .iter()
            .map(|m| MarketView::new(m, &self.bets, &self.owner, now_ms))
            .collect()
    }
}
