//! Transaction submission pipeline.
//!
//! sender -> raw signature -> composite signature -> execute. Nothing is
//! retried here; a submitted transaction cannot be withdrawn, so the caller
//! decides whether to try again.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    identity::{require_identity, IdentityProvider},
    ledger::{ExecutionReceipt, ExecutionStatus, LedgerClient},
    transaction::{TransactionData, TransactionDescriptor},
    MarketError,
};

/// Signs descriptors as the session's identity and executes them on the ledger
#[derive(Clone)]
pub struct Submitter {
    ledger: Arc<dyn LedgerClient>,
    identity: Arc<dyn IdentityProvider>,
    gas_budget: Option<u64>,
}

/// Provider failures other than a missing session all count as signing failures.
fn signing_error(err: MarketError) -> MarketError {
    match err {
        MarketError::NotAuthenticated | MarketError::SigningFailed(_) => err,
        other => MarketError::SigningFailed(other.to_string()),
    }
}

impl Submitter {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        identity: Arc<dyn IdentityProvider>,
        gas_budget: Option<u64>,
    ) -> Self {
        Self {
            ledger,
            identity,
            gas_budget,
        }
    }

    /// Sign and execute `descriptor`, returning the receipt of a successful execution.
    ///
    /// A receipt reporting failed effects becomes [`MarketError::SubmissionRejected`].
    #[tracing::instrument(skip_all, fields(call = %descriptor.target()))]
    pub async fn submit(&self, descriptor: &TransactionDescriptor) -> Result<ExecutionReceipt> {
        let sender = require_identity(self.identity.as_ref())?;
        let data = TransactionData::new(sender, descriptor.clone(), self.gas_budget);
        let bytes = data.to_bytes()?;
        debug!(sender = %data.sender, digest = %data.digest()?, "transaction built");

        let raw = self.identity.sign(&bytes).await.map_err(signing_error)?;
        let signature = self
            .identity
            .compose_proof(&raw)
            .await
            .map_err(signing_error)?;

        let receipt = self.ledger.execute(&bytes, &signature).await?;
        match &receipt.status {
            ExecutionStatus::Success => {
                info!(digest = %receipt.digest, "transaction executed");
                Ok(receipt)
            }
            ExecutionStatus::Failure { error } => {
                warn!(digest = %receipt.digest, %error, "transaction rejected");
                Err(MarketError::SubmissionRejected(error.clone()))
            }
        }
    }
}
