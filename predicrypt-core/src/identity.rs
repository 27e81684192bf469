//! Identity provider port.
//!
//! The embedding application owns login, the ephemeral keypair and the
//! proof material of the OAuth-derived signing scheme. This layer only asks
//! it who the current user is and to sign transaction bytes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::MarketError;

/// Signature over transaction bytes made with the session's ephemeral key
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RawSignature(pub String);

/// Raw signature combined with the provider's proof material, in the
/// format the ledger accepts for execution
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CompositeSignature(pub String);

// Signatures stay out of logs.
impl fmt::Debug for RawSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawSignature(..)")
    }
}

impl fmt::Debug for CompositeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompositeSignature(..)")
    }
}

/// Session and signing provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Whether a session is active.
    fn is_authenticated(&self) -> bool;

    /// Address of the signed-in account, `None` without a session.
    fn current_identity(&self) -> Option<String>;

    /// Sign serialized transaction bytes.
    async fn sign(&self, bytes: &[u8]) -> Result<RawSignature>;

    /// Wrap a raw signature into the composite signature for execution.
    async fn compose_proof(&self, raw: &RawSignature) -> Result<CompositeSignature>;
}

/// Resolve the caller's address, failing with `NotAuthenticated` without a session.
pub fn require_identity(provider: &dyn IdentityProvider) -> Result<String> {
    if !provider.is_authenticated() {
        return Err(MarketError::NotAuthenticated);
    }
    provider
        .current_identity()
        .ok_or(MarketError::NotAuthenticated)
}
