//! # PrediCrypt Core
//!
//! Market transaction and lifecycle layer for binary prediction markets held
//! on a Move smart-contract ledger, with identities from an OAuth-derived
//! signing scheme.
//!
//! This library turns user intents into contract calls and keeps the
//! derived view of market state:
//! - **Transactions**: `create_market`, `place_bet`, `resolve_market` and
//!   `claim_winnings` descriptors against a fixed package
//! - **Submission**: sender attachment, signing and composite-proof wrapping
//!   through an [`IdentityProvider`], execution through a [`LedgerClient`]
//! - **Reads**: decoding of owned `Market` and `Bet` objects
//! - **Lifecycle rules**: `Open -> AwaitingResolution -> Resolved`, pool
//!   shares and claim eligibility
//!
//! The ledger stays authoritative. Every local check is advisory and every
//! read is a fresh snapshot.
//!
//! ## Examples
//!
//! ```rust
//! use predicrypt_core::{CallArg, TransactionBuilder};
//!
//! let builder = TransactionBuilder::new("0x9c3f")?;
//! let tx = builder.build_place_bet("0x4d2a", true, 0.5)?;
//!
//! assert_eq!(tx.target(), "0x9c3f::prediction_market::place_bet");
//! assert_eq!(tx.arguments[2], CallArg::SplitGas(500_000_000));
//! Ok::<(), predicrypt_core::MarketError>(())
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod market;
pub mod poller;
pub mod service;
pub mod snapshot;
pub mod submit;
pub mod transaction;
pub mod units;
pub mod utils;

#[cfg(any(test, feature = "testkit"))]
pub mod test_utils;

pub use config::ClientConfig;
pub use error::{MarketError, Result};
pub use identity::{CompositeSignature, IdentityProvider, RawSignature};
pub use ledger::{ExecutionReceipt, ExecutionStatus, LedgerClient, LedgerObject, MarketReader};
pub use market::{Bet, Market, MarketState};
pub use poller::{PollerHandle, SnapshotPoller};
pub use service::MarketService;
pub use snapshot::{MarketSnapshot, MarketView};
pub use submit::Submitter;
pub use transaction::{CallArg, ContractFunction, TransactionBuilder, TransactionData, TransactionDescriptor};
pub use units::{pool_percentages, to_display_unit, to_smallest_unit, MIST_PER_SUI};
