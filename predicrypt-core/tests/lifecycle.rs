//! End-to-end market lifecycle against the in-memory ledger.

use std::sync::Arc;

use predicrypt_core::test_utils::{InMemoryLedger, StaticIdentity, BETTOR, CREATOR, PACKAGE_ID};
use predicrypt_core::{ClientConfig, Market, MarketError, MarketService, MarketState};

const NOW: u64 = 1_700_000_000_000;
// 2030-01-01T00:00:00Z
const END: u64 = 1_893_456_000_000;

fn service(ledger: &Arc<InMemoryLedger>, who: &str) -> MarketService {
    let config = ClientConfig::new(PACKAGE_ID).unwrap();
    MarketService::from_config(&config, ledger.clone(), Arc::new(StaticIdentity::new(who))).unwrap()
}

async fn create_market(creator: &MarketService) -> Market {
    let receipt = creator
        .create_market("Will it rain?", "Paris, new year's day 2030", "2030-01-01")
        .await
        .unwrap();
    assert_eq!(receipt.created.len(), 1);

    let markets = creator.fetch_markets().await.unwrap();
    assert_eq!(markets.len(), 1);
    markets.into_iter().next().unwrap()
}

#[tokio::test]
async fn test_full_lifecycle() {
    let ledger = Arc::new(InMemoryLedger::new(PACKAGE_ID, NOW));
    let creator = service(&ledger, CREATOR);
    let bettor = service(&ledger, BETTOR);

    let market = create_market(&creator).await;
    assert_eq!(market.creator, CREATOR);
    assert_eq!(market.end_timestamp, END);
    assert_eq!(market.state_at(NOW), MarketState::Open);
    assert_eq!(market.pool_percentages(), (0.0, 0.0));

    creator.place_bet_at(&market, true, 3.0, NOW).await.unwrap();
    bettor.place_bet_at(&market, false, 1.0, NOW).await.unwrap();

    let market = ledger.market(&market.id).unwrap();
    assert_eq!(market.yes_pool, 3_000_000_000);
    assert_eq!(market.no_pool, 1_000_000_000);
    assert_eq!(market.pool_percentages(), (75.0, 25.0));

    let bets = bettor.fetch_bets().await.unwrap();
    assert_eq!(bets.len(), 1);
    assert_eq!(bets[0].amount, 1_000_000_000);
    assert!(!bets[0].prediction);

    // Deadline passes on both clocks
    ledger.set_now(END);
    let err = bettor.place_bet_at(&market, true, 1.0, END).await.unwrap_err();
    assert!(matches!(err, MarketError::BettingClosed(_)));

    let err = bettor.resolve_market_at(&market, false, END).await.unwrap_err();
    assert!(matches!(err, MarketError::ResolutionNotAllowed(_)));

    creator.resolve_market_at(&market, false, END).await.unwrap();
    let resolved = ledger.market(&market.id).unwrap();
    assert_eq!(resolved.state_at(END), MarketState::Resolved);
    assert_eq!(resolved.outcome, Some(false));

    // The losing side has nothing to claim
    let creator_bets = creator.fetch_bets().await.unwrap();
    let err = creator
        .claim_for_market(&resolved, &creator_bets)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::IneligibleClaim(_)));

    bettor.claim_for_market(&resolved, &bets).await.unwrap();
    assert_eq!(ledger.paid_out(BETTOR), 4_000_000_000);
    assert!(bettor.fetch_bets().await.unwrap().is_empty());

    // Claiming the consumed bet again is refused by the ledger
    let err = bettor.claim_winnings(&resolved, &bets[0]).await.unwrap_err();
    assert!(matches!(err, MarketError::SubmissionRejected(_)));
    assert_eq!(ledger.paid_out(BETTOR), 4_000_000_000);
}

#[tokio::test]
async fn test_resolution_race_reports_already_resolved() {
    let ledger = Arc::new(InMemoryLedger::new(PACKAGE_ID, NOW));
    let creator = service(&ledger, CREATOR);
    let stale = create_market(&creator).await;

    ledger.set_now(END);
    creator.resolve_market_at(&stale, true, END).await.unwrap();

    // Acting on the stale snapshot gets past the local check
    let err = creator.resolve_market_at(&stale, false, END).await.unwrap_err();
    assert!(matches!(err, MarketError::AlreadyResolved(_)));
    assert_eq!(ledger.market(&stale.id).unwrap().outcome, Some(true));
}

#[tokio::test]
async fn test_ledger_clock_is_authoritative() {
    let ledger = Arc::new(InMemoryLedger::new(PACKAGE_ID, NOW));
    let creator = service(&ledger, CREATOR);
    let bettor = service(&ledger, BETTOR);
    let market = create_market(&creator).await;

    // Local clock says open, ledger says ended
    ledger.set_now(END + 1);
    let err = bettor.place_bet_at(&market, true, 1.0, END - 1).await.unwrap_err();
    assert!(matches!(err, MarketError::SubmissionRejected(_)));

    // Local clock says ended, ledger has not reached the deadline yet
    ledger.set_now(END - 1);
    let err = creator.resolve_market_at(&market, true, END).await.unwrap_err();
    assert!(matches!(err, MarketError::SubmissionRejected(_)));
    assert!(!ledger.market(&market.id).unwrap().resolved);
}

#[tokio::test]
async fn test_snapshot_views_for_creator() {
    let ledger = Arc::new(InMemoryLedger::new(PACKAGE_ID, NOW));
    let creator = service(&ledger, CREATOR);
    let market = create_market(&creator).await;
    creator.place_bet_at(&market, true, 0.5, NOW).await.unwrap();

    let snapshot = creator.fetch_snapshot().await.unwrap();
    assert_eq!(snapshot.owner, CREATOR);
    assert_eq!(snapshot.bets_for(&market.id).len(), 1);

    let views = snapshot.views(END);
    assert_eq!(views.len(), 1);
    assert!(views[0].can_resolve);
    assert!(!views[0].can_bet);
    assert_eq!(views[0].total_pool, "0.50");
    assert_eq!((views[0].yes_pct, views[0].no_pct), (100.0, 0.0));
}
