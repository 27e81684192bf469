//! # Prediction Market Model
//!
//! Markets and bets as read from the ledger, and the lifecycle rules that
//! decide which action a client may attempt on a market at a given time.
//!
//! The ledger holds the authoritative copy of every market. Values here are
//! snapshots, and time comparisons against the local clock are advisory: the
//! contract checks the same conditions against its own clock at commit time.

use crate::{error::Result, units, MarketError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A binary prediction market.
///
/// Created by `create_market`; only its pools, `resolved` and `outcome`
/// change afterwards, and only through ledger transactions.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Market {
    /// Ledger object id
    pub id: String,

    /// Market question
    pub title: String,

    /// Longer description of the resolution criteria
    pub description: String,

    /// Address of the account that created the market
    pub creator: String,

    /// Deadline in Unix milliseconds; betting closes and resolution opens here
    pub end_timestamp: u64,

    /// Total stake on "yes" in smallest units
    pub yes_pool: u64,

    /// Total stake on "no" in smallest units
    pub no_pool: u64,

    /// Whether the market has been resolved
    pub resolved: bool,

    /// Winning side, set once when resolved
    pub outcome: Option<bool>,
}

/// A stake placed by the current identity on one side of a market
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Bet {
    /// Ledger object id
    pub id: String,

    /// Market the bet was placed on
    pub market_id: String,

    /// Predicted side (`true` = yes)
    pub prediction: bool,

    /// Stake in smallest units
    pub amount: u64,
}

/// Lifecycle state of a market.
///
/// `Open -> AwaitingResolution -> Resolved`, never backwards.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarketState {
    /// Before the deadline; accepting bets
    Open,
    /// Past the deadline; waiting for the creator to resolve
    AwaitingResolution,
    /// Outcome fixed; winners may claim
    Resolved,
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::AwaitingResolution => write!(f, "Awaiting resolution"),
            Self::Resolved => write!(f, "Resolved"),
        }
    }
}

impl Market {
    /// Classify the market at `now_ms`. A resolved market is `Resolved`
    /// regardless of time.
    pub fn state_at(&self, now_ms: u64) -> MarketState {
        if self.resolved {
            MarketState::Resolved
        } else if now_ms < self.end_timestamp {
            MarketState::Open
        } else {
            MarketState::AwaitingResolution
        }
    }

    /// Both pools combined, in smallest units
    pub fn total_pool(&self) -> u64 {
        self.yes_pool.saturating_add(self.no_pool)
    }

    /// Yes/no share of the pool in percent
    pub fn pool_percentages(&self) -> (f64, f64) {
        units::pool_percentages(self.yes_pool, self.no_pool)
    }

    /// Whether a bet may be offered at `now_ms`
    pub fn can_bet(&self, now_ms: u64) -> bool {
        self.state_at(now_ms) == MarketState::Open
    }

    /// Whether `identity` may resolve the market at `now_ms`
    pub fn can_resolve(&self, identity: &str, now_ms: u64) -> bool {
        self.state_at(now_ms) == MarketState::AwaitingResolution && self.is_creator(identity)
    }

    /// Whether `identity` created this market
    pub fn is_creator(&self, identity: &str) -> bool {
        self.creator.eq_ignore_ascii_case(identity)
    }

    /// Whether `bet` was placed on this market. Ids compare case-insensitively.
    pub fn is_bet_on(&self, bet: &Bet) -> bool {
        bet.market_id.eq_ignore_ascii_case(&self.id)
    }

    /// Whether `bet` belongs to this market and picked the winning side
    pub fn is_winning_bet(&self, bet: &Bet) -> bool {
        self.resolved && self.is_bet_on(bet) && self.outcome == Some(bet.prediction)
    }

    /// All bets from `bets` that may claim winnings on this market
    pub fn winning_bets<'a>(&self, bets: &'a [Bet]) -> Vec<&'a Bet> {
        bets.iter().filter(|bet| self.is_winning_bet(bet)).collect()
    }

    /// Advisory payout for a winning bet: the stake plus its proportional
    /// share of the losing pool. `None` if the bet did not win.
    ///
    /// The ledger computes the real payout when the claim executes.
    pub fn estimated_payout(&self, bet: &Bet) -> Option<u64> {
        if !self.is_winning_bet(bet) {
            return None;
        }
        let (winning_pool, losing_pool) = if bet.prediction {
            (self.yes_pool, self.no_pool)
        } else {
            (self.no_pool, self.yes_pool)
        };
        if winning_pool == 0 {
            return Some(bet.amount);
        }
        let share = bet.amount as u128 * losing_pool as u128 / winning_pool as u128;
        Some(bet.amount.saturating_add(share.min(u64::MAX as u128) as u64))
    }

    /// Milliseconds left until the deadline, zero once it has passed
    pub fn time_remaining(&self, now_ms: u64) -> u64 {
        self.end_timestamp.saturating_sub(now_ms)
    }

    /// Precondition for placing a bet
    pub fn check_bet(&self, now_ms: u64) -> Result<()> {
        match self.state_at(now_ms) {
            MarketState::Open => Ok(()),
            MarketState::AwaitingResolution => Err(MarketError::BettingClosed(self.id.clone())),
            MarketState::Resolved => Err(MarketError::AlreadyResolved(self.id.clone())),
        }
    }

    /// Precondition for resolving the market as `identity`
    pub fn check_resolve(&self, identity: &str, now_ms: u64) -> Result<()> {
        match self.state_at(now_ms) {
            MarketState::Resolved => Err(MarketError::AlreadyResolved(self.id.clone())),
            MarketState::Open => Err(MarketError::ResolutionNotAllowed(format!(
                "market {} is still open for betting",
                self.id
            ))),
            MarketState::AwaitingResolution if !self.is_creator(identity) => {
                Err(MarketError::ResolutionNotAllowed(format!(
                    "only the creator {} can resolve market {}",
                    self.creator, self.id
                )))
            }
            MarketState::AwaitingResolution => Ok(()),
        }
    }

    /// Precondition for claiming winnings with `bet`
    pub fn check_claim(&self, bet: &Bet) -> Result<()> {
        if self.is_winning_bet(bet) {
            return Ok(());
        }
        let reason = if !self.is_bet_on(bet) {
            format!("bet {} belongs to market {}, not {}", bet.id, bet.market_id, self.id)
        } else if !self.resolved {
            format!("market {} is not resolved yet", self.id)
        } else {
            format!("bet {} did not predict the outcome of market {}", bet.id, self.id)
        };
        Err(MarketError::IneligibleClaim(reason))
    }

    /// Get market status summary
    pub fn get_status(&self, now_ms: u64) -> String {
        match self.state_at(now_ms) {
            MarketState::Resolved => match self.outcome {
                Some(true) => "Resolved - Outcome Yes".to_string(),
                Some(false) => "Resolved - Outcome No".to_string(),
                None => "Resolved - No outcome set".to_string(),
            },
            MarketState::AwaitingResolution => "Awaiting resolution by creator".to_string(),
            MarketState::Open => "Active - Accepting bets".to_string(),
        }
    }
}
