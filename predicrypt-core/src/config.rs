//! Client configuration supplied by the embedding application.
//!
//! ```toml
//! package_id = "0x9c3f..."
//! rpc_url = "https://fullnode.testnet.sui.io:443"
//! poll_interval_secs = 30
//! gas_budget = 10000000
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use serde::Deserialize;
use std::time::Duration;

use crate::{error::Result, utils::normalize_object_id, MarketError};

/// Default ledger endpoint
pub const DEFAULT_RPC_URL: &str = "https://fullnode.testnet.sui.io:443";

/// Default background refresh period in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Deployment address of the market contract package.
    pub package_id: String,
    /// Ledger RPC endpoint for the embedding application's client.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Gas budget attached to every transaction, in smallest units.
    #[serde(default)]
    pub gas_budget: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Logging configuration. Installing a subscriber is up to the binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything but the package
    pub fn new(package_id: &str) -> Result<Self> {
        let config = Self {
            package_id: package_id.to_string(),
            rpc_url: default_rpc_url(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            gas_budget: None,
            logging: LoggingConfig::default(),
        };
        config.validate()
    }

    /// Parse and validate TOML
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| MarketError::Config(format!("Invalid config: {e}")))?;
        config.validate()
    }

    fn validate(mut self) -> Result<Self> {
        self.package_id = normalize_object_id(&self.package_id)
            .map_err(|_| MarketError::Config(format!("Invalid package_id: {}", self.package_id)))?;
        if self.poll_interval_secs == 0 {
            return Err(MarketError::Config(
                "poll_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.gas_budget == Some(0) {
            return Err(MarketError::Config(
                "gas_budget must be greater than 0".to_string(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(MarketError::Config(format!(
                "Unknown logging format: {}",
                self.logging.format
            )));
        }
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
