//! # Ledger Access
//!
//! The [`LedgerClient`] port the embedding application implements on top of
//! its RPC transport, and the read adapter that decodes owned `Market` and
//! `Bet` objects into the crate's model.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::Result,
    identity::CompositeSignature,
    market::{Bet, Market},
    transaction::MODULE_NAME,
    utils::normalize_object_id,
    MarketError,
};

/// An object as returned by an owned-objects query, content already decoded
/// to its JSON field map
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LedgerObject {
    /// Object id
    pub object_id: String,

    /// Fully qualified struct type
    pub object_type: String,

    /// Move struct fields
    pub fields: Map<String, Value>,
}

/// Outcome of executing a transaction
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failure { error: String },
}

/// Execution receipt returned by the ledger
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExecutionReceipt {
    /// Transaction digest assigned by the ledger
    pub digest: String,

    /// Whether the effects were applied
    pub status: ExecutionStatus,

    /// Ids of objects created by the transaction
    #[serde(default)]
    pub created: Vec<String>,
}

impl ExecutionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Raw ledger client.
///
/// Implementations report network failures as [`MarketError::Transport`]
/// and bound every call by their own timeout.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// All objects of `struct_type` owned by `owner`, across all pages.
    async fn query_owned_objects(&self, owner: &str, struct_type: &str) -> Result<Vec<LedgerObject>>;

    /// Execute signed transaction bytes.
    async fn execute(&self, tx_bytes: &[u8], signature: &CompositeSignature)
        -> Result<ExecutionReceipt>;
}

/// Fully qualified type of a struct in the market module
pub fn struct_type(package_id: &str, name: &str) -> String {
    format!("{package_id}::{MODULE_NAME}::{name}")
}

/// Integers may arrive as JSON numbers or as decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireU64 {
    Number(u64),
    Text(String),
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    match WireU64::deserialize(deserializer)? {
        WireU64::Number(n) => Ok(n),
        WireU64::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// An `ID` field is either the bare id or wrapped as `{ "id": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Bare(String),
    Wrapped { id: String },
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match WireId::deserialize(deserializer)? {
        WireId::Bare(id) | WireId::Wrapped { id } => id,
    })
}

#[derive(Deserialize)]
struct MarketFields {
    title: String,
    description: String,
    creator: String,
    #[serde(deserialize_with = "de_u64")]
    end_timestamp: u64,
    #[serde(deserialize_with = "de_u64")]
    yes_pool: u64,
    #[serde(deserialize_with = "de_u64")]
    no_pool: u64,
    resolved: bool,
    #[serde(default)]
    outcome: Option<bool>,
}

#[derive(Deserialize)]
struct BetFields {
    #[serde(deserialize_with = "de_id")]
    market_id: String,
    prediction: bool,
    #[serde(deserialize_with = "de_u64")]
    amount: u64,
}

fn decode_fields<T: for<'de> Deserialize<'de>>(object: &LedgerObject) -> Result<T> {
    serde_json::from_value(Value::Object(object.fields.clone())).map_err(|e| {
        MarketError::Fetch(format!("Failed to decode object {}: {e}", object.object_id))
    })
}

/// Ids and addresses read from the ledger, lowercased like builder input
fn decode_id(object: &LedgerObject, id: &str) -> Result<String> {
    normalize_object_id(id).map_err(|_| {
        MarketError::Fetch(format!("Object {} carries invalid id {id}", object.object_id))
    })
}

/// Decode a `Market` object.
///
/// Ids are normalized to lowercase. The stored outcome is ignored until the market is resolved, and a
/// resolved market must carry one.
pub fn decode_market(object: &LedgerObject) -> Result<Market> {
    let fields: MarketFields = decode_fields(object)?;
    let outcome = if fields.resolved {
        Some(fields.outcome.ok_or_else(|| {
            MarketError::Fetch(format!(
                "Resolved market {} has no outcome",
                object.object_id
            ))
        })?)
    } else {
        None
    };

    Ok(Market {
        id: decode_id(object, &object.object_id)?,
        title: fields.title,
        description: fields.description,
        creator: decode_id(object, &fields.creator)?,
        end_timestamp: fields.end_timestamp,
        yes_pool: fields.yes_pool,
        no_pool: fields.no_pool,
        resolved: fields.resolved,
        outcome,
    })
}

/// Decode a `Bet` object
pub fn decode_bet(object: &LedgerObject) -> Result<Bet> {
    let fields: BetFields = decode_fields(object)?;
    Ok(Bet {
        id: decode_id(object, &object.object_id)?,
        market_id: decode_id(object, &fields.market_id)?,
        prediction: fields.prediction,
        amount: fields.amount,
    })
}

/// Read side of the ledger for one contract deployment.
///
/// Reads are idempotent and never coordinate with writes; each call reflects
/// the ledger as of the query.
#[derive(Clone)]
pub struct MarketReader {
    client: Arc<dyn LedgerClient>,
    package_id: String,
}

impl MarketReader {
    pub fn new(client: Arc<dyn LedgerClient>, package_id: impl Into<String>) -> Self {
        Self {
            client,
            package_id: package_id.into(),
        }
    }

    async fn fetch_objects(&self, owner: &str, name: &str) -> Result<Vec<LedgerObject>> {
        let ty = struct_type(&self.package_id, name);
        self.client
            .query_owned_objects(owner, &ty)
            .await
            .map_err(|e| match e {
                MarketError::Fetch(msg) => MarketError::Fetch(msg),
                other => MarketError::Fetch(format!("Querying {ty} for {owner}: {other}")),
            })
    }

    /// All markets owned by `owner`. Empty, not an error, when there are none.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_markets(&self, owner: &str) -> Result<Vec<Market>> {
        let markets = self
            .fetch_objects(owner, "Market")
            .await?
            .iter()
            .map(decode_market)
            .collect::<Result<Vec<_>>>()?;
        debug!(count = markets.len(), "fetched markets");
        Ok(markets)
    }

    /// All bets owned by `owner`
    #[tracing::instrument(skip(self))]
    pub async fn fetch_bets(&self, owner: &str) -> Result<Vec<Bet>> {
        let bets = self
            .fetch_objects(owner, "Bet")
            .await?
            .iter()
            .map(decode_bet)
            .collect::<Result<Vec<_>>>()?;
        debug!(count = bets.len(), "fetched bets");
        Ok(bets)
    }

    /// Markets and bets of `owner`, queried concurrently
    pub async fn fetch_all(&self, owner: &str) -> Result<(Vec<Market>, Vec<Bet>)> {
        tokio::try_join!(self.fetch_markets(owner), self.fetch_bets(owner))
    }
}
