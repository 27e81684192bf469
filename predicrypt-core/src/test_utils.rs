//! Common test utilities for predicrypt-core tests.
//!
//! Provides an in-memory ledger that applies the market contract's rules, a
//! static identity provider, and fixtures shared by unit and integration
//! tests. Compiled for `cfg(test)` or with the `testkit` feature.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

use crate::{
    error::Result,
    identity::{CompositeSignature, IdentityProvider, RawSignature},
    ledger::{
        decode_bet, decode_market, struct_type, ExecutionReceipt, ExecutionStatus, LedgerClient,
        LedgerObject,
    },
    market::{Bet, Market},
    transaction::{CallArg, ContractFunction, TransactionData},
    utils::sha256_hex,
    MarketError,
};

/// Contract package used throughout the tests
pub const PACKAGE_ID: &str = "0x9c3fa0e4b7d2c1f0e9a8b7c6d5e4f3a2b1c0d9e8f7a6b5c4d3e2f1a0b9c8d7e6";
/// Account that creates markets in the fixtures
pub const CREATOR: &str = "0xc4ea70e5a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c";
/// Account that bets in the fixtures
pub const BETTOR: &str = "0xbe770e5f0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f6071829300aa";
/// Market id used by the fixtures
pub const MARKET_ID: &str = "0x4d2a9f1e";
/// A second, unrelated market id
pub const OTHER_MARKET_ID: &str = "0x77aa01";

/// Market created by [`CREATOR`] with 3 SUI on yes and 1 SUI on no
pub fn sample_market(end_timestamp: u64) -> Market {
    Market {
        id: MARKET_ID.to_string(),
        title: "Will it rain in Paris on new year's day?".to_string(),
        description: "Resolves yes if Météo-France reports rain".to_string(),
        creator: CREATOR.to_string(),
        end_timestamp,
        yes_pool: 3_000_000_000,
        no_pool: 1_000_000_000,
        resolved: false,
        outcome: None,
    }
}

pub fn sample_bet(id: &str, market_id: &str, prediction: bool, amount: u64) -> Bet {
    Bet {
        id: id.to_string(),
        market_id: market_id.to_string(),
        prediction,
        amount,
    }
}

/// Signature [`StaticIdentity`] produces for `sender` over `bytes`
pub fn expected_signature(sender: &str, bytes: &[u8]) -> CompositeSignature {
    let mut payload = sender.as_bytes().to_vec();
    payload.extend_from_slice(bytes);
    CompositeSignature(format!("zk:{}", sha256_hex(&payload)))
}

/// Identity provider with a fixed address and deterministic signatures
pub struct StaticIdentity {
    address: Option<String>,
    fail_signing: AtomicBool,
}

impl StaticIdentity {
    pub fn new(address: &str) -> Self {
        Self {
            address: Some(address.to_string()),
            fail_signing: AtomicBool::new(false),
        }
    }

    /// No active session
    pub fn signed_out() -> Self {
        Self {
            address: None,
            fail_signing: AtomicBool::new(false),
        }
    }

    /// Make subsequent signing requests fail
    pub fn fail_signing(&self, fail: bool) {
        self.fail_signing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    fn is_authenticated(&self) -> bool {
        self.address.is_some()
    }

    fn current_identity(&self) -> Option<String> {
        self.address.clone()
    }

    async fn sign(&self, bytes: &[u8]) -> Result<RawSignature> {
        if self.fail_signing.load(Ordering::SeqCst) {
            return Err(MarketError::SigningFailed("proof expired".to_string()));
        }
        let address = self.address.as_ref().ok_or(MarketError::NotAuthenticated)?;
        let mut payload = address.as_bytes().to_vec();
        payload.extend_from_slice(bytes);
        Ok(RawSignature(sha256_hex(&payload)))
    }

    async fn compose_proof(&self, raw: &RawSignature) -> Result<CompositeSignature> {
        Ok(CompositeSignature(format!("zk:{}", raw.0)))
    }
}

struct StoredObject {
    owner: String,
    object: LedgerObject,
}

#[derive(Default)]
struct LedgerState {
    objects: Vec<StoredObject>,
    executed: Vec<TransactionData>,
    paid_out: HashMap<String, u64>,
    next_id: u64,
}

/// In-memory ledger applying the market contract's rules
pub struct InMemoryLedger {
    package_id: String,
    clock: AtomicU64,
    fail_queries: AtomicBool,
    fail_executions: AtomicBool,
    queries_paused: watch::Sender<bool>,
    queries_started: AtomicU64,
    state: Mutex<LedgerState>,
}

type Applied = std::result::Result<Vec<String>, String>;

impl InMemoryLedger {
    /// Empty ledger for `package_id` whose clock reads `now_ms`
    pub fn new(package_id: &str, now_ms: u64) -> Self {
        Self {
            package_id: package_id.to_string(),
            clock: AtomicU64::new(now_ms),
            fail_queries: AtomicBool::new(false),
            fail_executions: AtomicBool::new(false),
            queries_paused: watch::channel(false).0,
            queries_started: AtomicU64::new(0),
            state: Mutex::new(LedgerState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn now(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }

    pub fn set_now(&self, now_ms: u64) {
        self.clock.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.clock.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Hold every query, new and in flight, until resumed
    pub fn pause_queries(&self, paused: bool) {
        self.queries_paused.send_replace(paused);
    }

    /// Number of owned-object queries received so far
    pub fn queries_started(&self) -> u64 {
        self.queries_started.load(Ordering::SeqCst)
    }

    pub fn fail_executions(&self, fail: bool) {
        self.fail_executions.store(fail, Ordering::SeqCst);
    }

    /// Every well-formed transaction received, applied or not
    pub fn executed(&self) -> Vec<TransactionData> {
        self.state().executed.clone()
    }

    /// Total winnings paid to `address`
    pub fn paid_out(&self, address: &str) -> u64 {
        self.state().paid_out.get(address).copied().unwrap_or(0)
    }

    /// Seed an object directly
    pub fn insert_object(&self, owner: &str, object: LedgerObject) {
        self.state().objects.push(StoredObject {
            owner: owner.to_string(),
            object,
        });
    }

    /// Current market object `id`, decoded
    pub fn market(&self, id: &str) -> Option<Market> {
        let state = self.state();
        state
            .objects
            .iter()
            .find(|o| o.object.object_id == id)
            .and_then(|o| decode_market(&o.object).ok())
    }

    fn apply(&self, state: &mut LedgerState, tx: &TransactionData) -> Applied {
        if tx.call.package_id != self.package_id {
            return Err(format!("Package {} not found", tx.call.package_id));
        }
        let now = self.now();
        match (tx.call.function, tx.call.arguments.as_slice()) {
            (
                ContractFunction::CreateMarket,
                [CallArg::String(title), CallArg::String(description), CallArg::U64(end), CallArg::Clock],
            ) => {
                if *end <= now {
                    return Err("MoveAbort(create_market, 0): end timestamp in the past".into());
                }
                let id = mint_id(state);
                let fields = json!({
                    "id": { "id": id },
                    "title": title,
                    "description": description,
                    "creator": tx.sender,
                    "end_timestamp": end.to_string(),
                    "yes_pool": "0",
                    "no_pool": "0",
                    "resolved": false,
                    "outcome": false
                });
                self.store(state, &tx.sender, &id, "Market", fields);
                Ok(vec![id])
            }
            (
                ContractFunction::PlaceBet,
                [CallArg::Object(market_id), CallArg::Bool(prediction), CallArg::SplitGas(amount), CallArg::Clock],
            ) => {
                let market = find_market(state, market_id)?;
                if market.resolved {
                    return Err("MoveAbort(place_bet, 1): market resolved".into());
                }
                if now >= market.end_timestamp {
                    return Err("MoveAbort(place_bet, 2): market ended".into());
                }
                if *amount == 0 {
                    return Err("MoveAbort(place_bet, 3): zero stake".into());
                }
                let (pool, value) = if *prediction {
                    ("yes_pool", market.yes_pool + amount)
                } else {
                    ("no_pool", market.no_pool + amount)
                };
                set_field(state, market_id, pool, json!(value.to_string()));

                let id = mint_id(state);
                let fields = json!({
                    "id": { "id": id },
                    "market_id": market_id,
                    "prediction": prediction,
                    "amount": amount.to_string()
                });
                self.store(state, &tx.sender, &id, "Bet", fields);
                Ok(vec![id])
            }
            (
                ContractFunction::ResolveMarket,
                [CallArg::Object(market_id), CallArg::Bool(outcome), CallArg::Clock],
            ) => {
                let market = find_market(state, market_id)?;
                if market.creator != tx.sender {
                    return Err("MoveAbort(resolve_market, 4): not creator".into());
                }
                if market.resolved {
                    return Err("MoveAbort(resolve_market, 5): already resolved".into());
                }
                if now < market.end_timestamp {
                    return Err("MoveAbort(resolve_market, 6): market not ended".into());
                }
                set_field(state, market_id, "resolved", json!(true));
                set_field(state, market_id, "outcome", json!(outcome));
                Ok(vec![])
            }
            (ContractFunction::ClaimWinnings, [CallArg::Object(market_id), CallArg::Object(bet_id)]) => {
                let market = find_market(state, market_id)?;
                let position = state
                    .objects
                    .iter()
                    .position(|o| o.object.object_id == *bet_id && o.owner == tx.sender)
                    .ok_or_else(|| format!("Object {bet_id} not owned by sender"))?;
                let bet = decode_bet(&state.objects[position].object).map_err(|e| e.to_string())?;
                if !market.resolved {
                    return Err("MoveAbort(claim_winnings, 7): market not resolved".into());
                }
                if bet.market_id != market.id || market.outcome != Some(bet.prediction) {
                    return Err("MoveAbort(claim_winnings, 8): not a winning bet".into());
                }
                let payout = market.estimated_payout(&bet).unwrap_or(bet.amount);
                state.objects.remove(position);
                *state.paid_out.entry(tx.sender.clone()).or_default() += payout;
                Ok(vec![])
            }
            (function, _) => Err(format!("Invalid arguments for {function}")),
        }
    }

    fn store(&self, state: &mut LedgerState, owner: &str, id: &str, name: &str, fields: Value) {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        state.objects.push(StoredObject {
            owner: owner.to_string(),
            object: LedgerObject {
                object_id: id.to_string(),
                object_type: struct_type(&self.package_id, name),
                fields,
            },
        });
    }
}

fn mint_id(state: &mut LedgerState) -> String {
    state.next_id += 1;
    format!("0x{:064x}", state.next_id)
}

fn find_market(state: &LedgerState, id: &str) -> std::result::Result<Market, String> {
    state
        .objects
        .iter()
        .find(|o| o.object.object_id == id)
        .ok_or_else(|| format!("Object {id} not found"))
        .and_then(|o| decode_market(&o.object).map_err(|e| e.to_string()))
}

fn set_field(state: &mut LedgerState, id: &str, field: &str, value: Value) {
    if let Some(stored) = state.objects.iter_mut().find(|o| o.object.object_id == id) {
        stored.object.fields.insert(field.to_string(), value);
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn query_owned_objects(&self, owner: &str, struct_type: &str) -> Result<Vec<LedgerObject>> {
        self.queries_started.fetch_add(1, Ordering::SeqCst);
        let mut paused = self.queries_paused.subscribe();
        // The sender lives as long as the ledger, so this only ends on resume
        let _ = paused.wait_for(|paused| !*paused).await;

        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(MarketError::Transport("connection refused".to_string()));
        }
        Ok(self
            .state()
            .objects
            .iter()
            .filter(|o| o.owner == owner && o.object.object_type == struct_type)
            .map(|o| o.object.clone())
            .collect())
    }

    async fn execute(
        &self,
        tx_bytes: &[u8],
        signature: &CompositeSignature,
    ) -> Result<ExecutionReceipt> {
        if self.fail_executions.load(Ordering::SeqCst) {
            return Err(MarketError::Transport("request timed out".to_string()));
        }
        let digest = sha256_hex(tx_bytes);
        let failure = |error: String| ExecutionReceipt {
            digest: digest.clone(),
            status: ExecutionStatus::Failure { error },
            created: Vec::new(),
        };

        let tx = match TransactionData::from_bytes(tx_bytes) {
            Ok(tx) => tx,
            Err(e) => return Ok(failure(format!("Malformed transaction: {e}"))),
        };
        if *signature != expected_signature(&tx.sender, tx_bytes) {
            return Ok(failure("Invalid signature".to_string()));
        }

        let mut state = self.state();
        state.executed.push(tx.clone());
        Ok(match self.apply(&mut state, &tx) {
            Ok(created) => ExecutionReceipt {
                digest: digest.clone(),
                status: ExecutionStatus::Success,
                created,
            },
            Err(error) => failure(error),
        })
    }
}
