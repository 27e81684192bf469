//! # Market Service
//!
//! Lifecycle operations for one signed-in session: check the snapshot-level
//! preconditions, build the call, submit it. Every operation either returns
//! the ledger receipt or an error; nothing is cached, callers re-fetch after
//! a write (the ledger may briefly still show the prior state).

use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    config::ClientConfig,
    error::Result,
    identity::{require_identity, IdentityProvider},
    ledger::{ExecutionReceipt, LedgerClient, MarketReader},
    market::{Bet, Market},
    snapshot::MarketSnapshot,
    submit::Submitter,
    transaction::TransactionBuilder,
    utils::now_millis,
    MarketError,
};

/// Entry point tying builder, submitter and reader to one session
#[derive(Clone)]
pub struct MarketService {
    builder: TransactionBuilder,
    reader: MarketReader,
    submitter: Submitter,
    identity: Arc<dyn IdentityProvider>,
}

impl MarketService {
    /// Create a service for the deployment at `package_id`
    pub fn new(
        package_id: &str,
        ledger: Arc<dyn LedgerClient>,
        identity: Arc<dyn IdentityProvider>,
        gas_budget: Option<u64>,
    ) -> Result<Self> {
        let builder = TransactionBuilder::new(package_id)?;
        let reader = MarketReader::new(ledger.clone(), builder.package_id());
        let submitter = Submitter::new(ledger, identity.clone(), gas_budget);
        Ok(Self {
            builder,
            reader,
            submitter,
            identity,
        })
    }

    /// Create a service from client configuration
    pub fn from_config(
        config: &ClientConfig,
        ledger: Arc<dyn LedgerClient>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        Self::new(&config.package_id, ledger, identity, config.gas_budget)
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    /// Address of the signed-in account
    pub fn identity(&self) -> Result<String> {
        require_identity(self.identity.as_ref())
    }

    /// Create a market closing at `end_date` (see [`crate::utils::parse_end_date`])
    #[tracing::instrument(skip(self, description))]
    pub async fn create_market(
        &self,
        title: &str,
        description: &str,
        end_date: &str,
    ) -> Result<ExecutionReceipt> {
        let tx = self.builder.build_create(title, description, end_date)?;
        self.submitter.submit(&tx).await
    }

    /// Stake `amount` display units on `prediction`
    #[tracing::instrument(skip(self, market), fields(market = %market.id))]
    pub async fn place_bet(
        &self,
        market: &Market,
        prediction: bool,
        amount: f64,
    ) -> Result<ExecutionReceipt> {
        self.place_bet_at(market, prediction, amount, now_millis()).await
    }

    /// [`MarketService::place_bet`] with an explicit client clock
    pub async fn place_bet_at(
        &self,
        market: &Market,
        prediction: bool,
        amount: f64,
        now_ms: u64,
    ) -> Result<ExecutionReceipt> {
        market.check_bet(now_ms)?;
        let tx = self.builder.build_place_bet(&market.id, prediction, amount)?;
        self.submitter.submit(&tx).await
    }

    /// Resolve `market` with `outcome` as its creator
    #[tracing::instrument(skip(self, market), fields(market = %market.id))]
    pub async fn resolve_market(&self, market: &Market, outcome: bool) -> Result<ExecutionReceipt> {
        self.resolve_market_at(market, outcome, now_millis()).await
    }

    /// [`MarketService::resolve_market`] with an explicit client clock.
    ///
    /// If the ledger rejects the call and a fresh read shows the market
    /// resolved, another resolution won the race: `AlreadyResolved`.
    pub async fn resolve_market_at(
        &self,
        market: &Market,
        outcome: bool,
        now_ms: u64,
    ) -> Result<ExecutionReceipt> {
        let identity = self.identity()?;
        market.check_resolve(&identity, now_ms)?;
        let tx = self.builder.build_resolve(&market.id, outcome)?;

        match self.submitter.submit(&tx).await {
            Err(MarketError::SubmissionRejected(reason)) => {
                if self.is_resolved_on_ledger(market).await {
                    warn!(market = %market.id, "resolution lost to an earlier one");
                    Err(MarketError::AlreadyResolved(market.id.clone()))
                } else {
                    Err(MarketError::SubmissionRejected(reason))
                }
            }
            other => other,
        }
    }

    async fn is_resolved_on_ledger(&self, market: &Market) -> bool {
        match self.reader.fetch_markets(&market.creator).await {
            Ok(markets) => markets.iter().any(|m| m.id == market.id && m.resolved),
            Err(e) => {
                debug!(error = %e, "could not re-read market after rejection");
                false
            }
        }
    }

    /// Claim winnings of `bet` on `market`. The bet must have won.
    #[tracing::instrument(skip(self, market, bet), fields(market = %market.id, bet = %bet.id))]
    pub async fn claim_winnings(&self, market: &Market, bet: &Bet) -> Result<ExecutionReceipt> {
        market.check_claim(bet)?;
        let tx = self.builder.build_claim(&market.id, &bet.id)?;
        self.submitter.submit(&tx).await
    }

    /// Claim with the first of `bets` that won `market`
    pub async fn claim_for_market(&self, market: &Market, bets: &[Bet]) -> Result<ExecutionReceipt> {
        let bet = market.winning_bets(bets).into_iter().next().ok_or_else(|| {
            MarketError::IneligibleClaim(format!("no winning bet on market {}", market.id))
        })?;
        self.claim_winnings(market, bet).await
    }

    /// Markets owned by the signed-in account
    pub async fn fetch_markets(&self) -> Result<Vec<Market>> {
        let owner = self.identity()?;
        self.reader.fetch_markets(&owner).await
    }

    /// Bets owned by the signed-in account
    pub async fn fetch_bets(&self) -> Result<Vec<Bet>> {
        let owner = self.identity()?;
        self.reader.fetch_bets(&owner).await
    }

    /// Markets and bets of the signed-in account in one consistent refresh
    pub async fn fetch_snapshot(&self) -> Result<MarketSnapshot> {
        let owner = self.identity()?;
        let (markets, bets) = self.reader.fetch_all(&owner).await?;
        Ok(MarketSnapshot::new(owner, markets, bets, now_millis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        sample_bet, sample_market, InMemoryLedger, StaticIdentity, BETTOR, CREATOR, MARKET_ID,
        PACKAGE_ID,
    };

    const NOW: u64 = 1_700_000_000_000;

    fn service(ledger: &Arc<InMemoryLedger>, who: &str) -> MarketService {
        MarketService::new(PACKAGE_ID, ledger.clone(), Arc::new(StaticIdentity::new(who)), None)
            .unwrap()
    }

    #[tokio::test]
    async fn test_bet_after_deadline_rejected_before_submission() {
        let ledger = Arc::new(InMemoryLedger::new(PACKAGE_ID, NOW));
        let market = sample_market(NOW);
        let err = service(&ledger, BETTOR)
            .place_bet_at(&market, true, 1.0, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::BettingClosed(_)));
        assert!(ledger.executed().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_resolved_market_rejected_before_submission() {
        let ledger = Arc::new(InMemoryLedger::new(PACKAGE_ID, NOW));
        let mut market = sample_market(NOW - 1);
        market.resolved = true;
        market.outcome = Some(true);
        let err = service(&ledger, CREATOR)
            .resolve_market_at(&market, false, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::AlreadyResolved(_)));
        assert!(ledger.executed().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_by_non_creator_rejected() {
        let ledger = Arc::new(InMemoryLedger::new(PACKAGE_ID, NOW));
        let market = sample_market(NOW - 1);
        let err = service(&ledger, BETTOR)
            .resolve_market_at(&market, true, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::ResolutionNotAllowed(_)));
    }

    #[tokio::test]
    async fn test_claim_with_losing_bet_is_ineligible() {
        let ledger = Arc::new(InMemoryLedger::new(PACKAGE_ID, NOW));
        let mut market = sample_market(NOW - 1);
        market.resolved = true;
        market.outcome = Some(true);
        let losing = sample_bet("0xb1", MARKET_ID, false, 1_000);

        let svc = service(&ledger, BETTOR);
        let err = svc.claim_winnings(&market, &losing).await.unwrap_err();
        assert!(matches!(err, MarketError::IneligibleClaim(_)));

        let err = svc
            .claim_for_market(&market, std::slice::from_ref(&losing))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::IneligibleClaim(_)));
        assert!(ledger.executed().is_empty());
    }

    #[tokio::test]
    async fn test_signed_out_fetch() {
        let ledger = Arc::new(InMemoryLedger::new(PACKAGE_ID, NOW));
        let svc = MarketService::new(
            PACKAGE_ID,
            ledger,
            Arc::new(StaticIdentity::signed_out()),
            None,
        )
        .unwrap();
        assert!(matches!(
            svc.fetch_markets().await,
            Err(MarketError::NotAuthenticated)
        ));
    }
}
