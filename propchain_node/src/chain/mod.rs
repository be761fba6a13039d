//! Ganache integration
//!
//! The contracts themselves are deployed out of band by Truffle. This module
//! only reads their build artifacts, funds demo wallets from the admin key and
//! registers seed listings in the PropertyRegistry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod artifacts;
pub mod ethereum;

pub use artifacts::{ArtifactRegistry, ContractArtifact, Deployment, KNOWN_CONTRACTS};
pub use ethereum::EthLedger;

pub const PROPERTY_REGISTRY: &str = "PropertyRegistry";
pub const DEPOSIT_QUEUE: &str = "DepositQueue";
pub const MAINTENANCE_FEE: &str = "MaintenanceFee";
pub const RENT_PAYMENT: &str = "RentPayment";

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("blockchain integration is disabled")]
    Disabled,
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("contract artifact {0} not loaded")]
    MissingArtifact(String),
    #[error("contract {0} not deployed on any network")]
    NotDeployed(String),
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("transaction {0} dropped before confirmation")]
    Dropped(String),
    #[error("event {0} not found in receipt")]
    MissingEvent(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub chain_id: u64,
    pub network_id: String,
    pub block_number: u64,
}

/// Listing data passed to `PropertyRegistry.registerProperty`
#[derive(Debug, Clone)]
pub struct PropertyListing {
    pub property_type: String,
    /// "street, district, city"
    pub location: String,
    pub price: u128,
    pub maintenance_fee: u128,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub property_id: String,
    pub tx_hash: String,
}

/// Operations the backend performs against the chain
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn status(&self) -> Result<ChainStatus, ChainError>;

    /// Send the configured funding amount from the admin key. Returns the tx hash
    /// once the transaction is mined.
    async fn fund_wallet(&self, address: &str) -> Result<String, ChainError>;

    /// Register a listing signed by `owner_key` and return the id from the
    /// `PropertyRegistered` event
    async fn register_property(
        &self,
        owner_key: &str,
        listing: &PropertyListing,
    ) -> Result<Registration, ChainError>;
}

/// Stand-in used when `chain_enabled` is off; every call fails with `Disabled`
pub struct DisabledLedger;

#[async_trait]
impl Ledger for DisabledLedger {
    async fn status(&self) -> Result<ChainStatus, ChainError> {
        Err(ChainError::Disabled)
    }

    async fn fund_wallet(&self, _address: &str) -> Result<String, ChainError> {
        Err(ChainError::Disabled)
    }

    async fn register_property(
        &self,
        _owner_key: &str,
        _listing: &PropertyListing,
    ) -> Result<Registration, ChainError> {
        Err(ChainError::Disabled)
    }
}
