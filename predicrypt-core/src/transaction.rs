//! # Market Transaction Builder
//!
//! Shapes the four contract calls (`create_market`, `place_bet`,
//! `resolve_market`, `claim_winnings`) into transaction descriptors. Building
//! never touches the network and never checks lifecycle preconditions; that
//! is left to [`crate::market::Market`] and the ledger.

use crate::{
    error::Result,
    units,
    utils::{normalize_object_id, parse_end_date, sha256_hex},
    MarketError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Move module holding the market entry functions
pub const MODULE_NAME: &str = "prediction_market";

/// Shared clock object id
pub const CLOCK_OBJECT_ID: &str = "0x6";

/// Entry functions of the market contract
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractFunction {
    CreateMarket,
    PlaceBet,
    ResolveMarket,
    ClaimWinnings,
}

impl ContractFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateMarket => "create_market",
            Self::PlaceBet => "place_bet",
            Self::ResolveMarket => "resolve_market",
            Self::ClaimWinnings => "claim_winnings",
        }
    }
}

impl fmt::Display for ContractFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One argument of a contract call. Order and kind are part of the wire contract.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallArg {
    /// UTF-8 string
    String(String),
    /// Unsigned 64-bit integer
    U64(u64),
    /// Boolean
    Bool(bool),
    /// Reference to an existing ledger object
    Object(String),
    /// Reference to the shared clock object
    Clock,
    /// Fresh coin of exactly this many smallest units split from the gas coin
    SplitGas(u64),
}

/// A contract call ready to be attached to a sender and signed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionDescriptor {
    /// Deployment address of the contract package
    pub package_id: String,

    /// Called entry function
    pub function: ContractFunction,

    /// Ordered call arguments
    pub arguments: Vec<CallArg>,
}

impl TransactionDescriptor {
    /// Fully qualified call target, `<package>::prediction_market::<function>`
    pub fn target(&self) -> String {
        format!("{}::{}::{}", self.package_id, MODULE_NAME, self.function)
    }

    /// Amount split from gas for the stake, if the call carries one
    pub fn split_amount(&self) -> Option<u64> {
        self.arguments.iter().find_map(|arg| match arg {
            CallArg::SplitGas(amount) => Some(*amount),
            _ => None,
        })
    }

    /// First object argument, which is the market for every call except create
    pub fn market_id(&self) -> Option<&str> {
        match self.function {
            ContractFunction::CreateMarket => None,
            _ => self.arguments.iter().find_map(|arg| match arg {
                CallArg::Object(id) => Some(id.as_str()),
                _ => None,
            }),
        }
    }
}

/// A descriptor bound to its sender: the unit that gets signed and executed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionData {
    /// Address paying gas and authorizing the call
    pub sender: String,

    /// Gas budget in smallest units, if fixed by configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_budget: Option<u64>,

    /// The contract call
    pub call: TransactionDescriptor,
}

impl TransactionData {
    pub fn new(sender: String, call: TransactionDescriptor, gas_budget: Option<u64>) -> Self {
        Self {
            sender,
            gas_budget,
            call,
        }
    }

    /// Canonical serialized bytes; this is what gets signed
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode bytes produced by [`TransactionData::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Hex SHA-256 of the serialized bytes
    pub fn digest(&self) -> Result<String> {
        Ok(sha256_hex(&self.to_bytes()?))
    }
}

/// Builds descriptors against one contract deployment
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    package_id: String,
}

impl TransactionBuilder {
    /// Create a builder for the package at `package_id`
    pub fn new(package_id: &str) -> Result<Self> {
        Ok(Self {
            package_id: normalize_object_id(package_id)?,
        })
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    fn descriptor(&self, function: ContractFunction, arguments: Vec<CallArg>) -> TransactionDescriptor {
        TransactionDescriptor {
            package_id: self.package_id.clone(),
            function,
            arguments,
        }
    }

    /// `create_market(title, description, end_timestamp, clock)`
    ///
    /// `end_date` is parsed by [`parse_end_date`]. Whether the deadline lies
    /// in the future is checked by the contract against the ledger clock.
    pub fn build_create(
        &self,
        title: &str,
        description: &str,
        end_date: &str,
    ) -> Result<TransactionDescriptor> {
        let end_timestamp = parse_end_date(end_date)?;
        self.build_create_at(title, description, end_timestamp)
    }

    /// `create_market` with the deadline already in Unix milliseconds
    pub fn build_create_at(
        &self,
        title: &str,
        description: &str,
        end_timestamp: u64,
    ) -> Result<TransactionDescriptor> {
        if title.trim().is_empty() {
            return Err(MarketError::InvalidInput("Title cannot be empty".to_string()));
        }
        if description.trim().is_empty() {
            return Err(MarketError::InvalidInput(
                "Description cannot be empty".to_string(),
            ));
        }

        Ok(self.descriptor(
            ContractFunction::CreateMarket,
            vec![
                CallArg::String(title.to_string()),
                CallArg::String(description.to_string()),
                CallArg::U64(end_timestamp),
                CallArg::Clock,
            ],
        ))
    }

    /// `place_bet(market, prediction, coin, clock)` staking `amount` display units
    pub fn build_place_bet(
        &self,
        market_id: &str,
        prediction: bool,
        amount: f64,
    ) -> Result<TransactionDescriptor> {
        let market_id = normalize_object_id(market_id)?;
        let amount_mist = units::parse_stake(amount)?;

        Ok(self.descriptor(
            ContractFunction::PlaceBet,
            vec![
                CallArg::Object(market_id),
                CallArg::Bool(prediction),
                CallArg::SplitGas(amount_mist),
                CallArg::Clock,
            ],
        ))
    }

    /// `resolve_market(market, outcome, clock)`
    pub fn build_resolve(&self, market_id: &str, outcome: bool) -> Result<TransactionDescriptor> {
        let market_id = normalize_object_id(market_id)?;

        Ok(self.descriptor(
            ContractFunction::ResolveMarket,
            vec![
                CallArg::Object(market_id),
                CallArg::Bool(outcome),
                CallArg::Clock,
            ],
        ))
    }

    /// `claim_winnings(market, bet)`
    pub fn build_claim(&self, market_id: &str, bet_id: &str) -> Result<TransactionDescriptor> {
        let market_id = normalize_object_id(market_id)?;
        let bet_id = normalize_object_id(bet_id)?;

        Ok(self.descriptor(
            ContractFunction::ClaimWinnings,
            vec![CallArg::Object(market_id), CallArg::Object(bet_id)],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MARKET_ID, PACKAGE_ID};

    fn builder() -> TransactionBuilder {
        TransactionBuilder::new(PACKAGE_ID).unwrap()
    }

    #[test]
    fn test_builder_rejects_bad_package() {
        assert!(TransactionBuilder::new("prediction_market").is_err());
    }

    #[test]
    fn test_build_create() {
        let tx = builder()
            .build_create("Will it rain?", "Rain in Paris on 2025-01-01", "2025-01-01")
            .unwrap();
        assert_eq!(tx.function, ContractFunction::CreateMarket);
        assert_eq!(tx.target(), format!("{PACKAGE_ID}::prediction_market::create_market"));
        assert_eq!(
            tx.arguments,
            vec![
                CallArg::String("Will it rain?".to_string()),
                CallArg::String("Rain in Paris on 2025-01-01".to_string()),
                CallArg::U64(1_735_689_600_000),
                CallArg::Clock,
            ]
        );
        assert_eq!(tx.market_id(), None);
    }

    #[test]
    fn test_build_create_invalid_input() {
        let b = builder();
        for (title, description, end) in [
            ("", "desc", "2025-01-01"),
            ("   ", "desc", "2025-01-01"),
            ("title", "", "2025-01-01"),
            ("title", "desc", "not a date"),
        ] {
            assert!(
                matches!(
                    b.build_create(title, description, end),
                    Err(MarketError::InvalidInput(_))
                ),
                "{title:?}/{description:?}/{end:?} should be invalid"
            );
        }
    }

    #[test]
    fn test_build_place_bet_splits_exact_stake() {
        let tx = builder().build_place_bet(MARKET_ID, true, 0.5).unwrap();
        assert_eq!(tx.split_amount(), Some(500_000_000));
        assert_eq!(
            tx.arguments,
            vec![
                CallArg::Object(MARKET_ID.to_string()),
                CallArg::Bool(true),
                CallArg::SplitGas(500_000_000),
                CallArg::Clock,
            ]
        );
        assert_eq!(tx.market_id(), Some(MARKET_ID));
    }

    #[test]
    fn test_build_place_bet_rejects_non_positive() {
        let b = builder();
        assert!(matches!(
            b.build_place_bet(MARKET_ID, true, 0.0),
            Err(MarketError::InvalidInput(_))
        ));
        assert!(matches!(
            b.build_place_bet(MARKET_ID, false, -2.0),
            Err(MarketError::InvalidInput(_))
        ));
        assert!(b.build_place_bet("market-1", true, 1.0).is_err());
    }

    #[test]
    fn test_build_resolve_and_claim() {
        let b = builder();
        let resolve = b.build_resolve(MARKET_ID, false).unwrap();
        assert_eq!(resolve.function, ContractFunction::ResolveMarket);
        assert_eq!(
            resolve.arguments,
            vec![
                CallArg::Object(MARKET_ID.to_string()),
                CallArg::Bool(false),
                CallArg::Clock,
            ]
        );

        let claim = b.build_claim(MARKET_ID, "0xB0").unwrap();
        assert_eq!(claim.target(), format!("{PACKAGE_ID}::prediction_market::claim_winnings"));
        assert_eq!(
            claim.arguments,
            vec![
                CallArg::Object(MARKET_ID.to_string()),
                CallArg::Object("0xb0".to_string()),
            ]
        );
        assert_eq!(claim.split_amount(), None);
    }

    #[test]
    fn test_transaction_data_bytes_and_digest() {
        let call = builder().build_resolve(MARKET_ID, true).unwrap();
        let data = TransactionData::new("0xa11ce".to_string(), call, Some(10_000_000));
        let bytes = data.to_bytes().unwrap();
        assert_eq!(TransactionData::from_bytes(&bytes).unwrap(), data);

        let digest = data.digest().unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, data.digest().unwrap());

        let other = TransactionData::new("0xb0b".to_string(), data.call.clone(), None);
        assert_ne!(other.digest().unwrap(), digest);
    }
}
