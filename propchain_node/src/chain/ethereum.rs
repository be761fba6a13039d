//! Ledger backed by a JSON-RPC node (Ganache in development) using ethers-rs

use super::{
    ArtifactRegistry, ChainError, ChainStatus, Ledger, PropertyListing, Registration,
    PROPERTY_REGISTRY,
};
use crate::config::Config;
use async_trait::async_trait;
use ethers::abi::{RawLog, Token};
use ethers::prelude::*;
use log::info;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;

type Funder = NonceManagerMiddleware<SignerMiddleware<Provider<Http>, LocalWallet>>;

const REGISTERED_EVENT: &str = "PropertyRegistered";

fn rpc<E: std::fmt::Display>(err: E) -> ChainError {
    ChainError::Rpc(err.to_string())
}

pub struct EthLedger {
    provider: Provider<Http>,
    admin_key: String,
    funding_amount: U256,
    artifacts: Arc<ArtifactRegistry>,
    /// Built on first use so the node can start while the chain is down.
    /// The nonce manager keeps back-to-back fundings from reusing a nonce.
    funder: OnceCell<Arc<Funder>>,
}

impl EthLedger {
    pub fn new(config: &Config, artifacts: Arc<ArtifactRegistry>) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(config.blockchain_url.as_str())
            .map_err(|e| ChainError::Rpc(format!("Failed to create HTTP provider: {}", e)))?;
        config
            .admin_private_key
            .parse::<LocalWallet>()
            .map_err(|e| ChainError::InvalidKey(e.to_string()))?;
        let funding_amount = ethers::utils::parse_ether(config.funding_amount_eth).map_err(rpc)?;

        Ok(Self {
            provider,
            admin_key: config.admin_private_key.clone(),
            funding_amount,
            artifacts,
            funder: OnceCell::new(),
        })
    }

    async fn signer_for(&self, private_key: &str) -> Result<LocalWallet, ChainError> {
        let chain_id = self.provider.get_chainid().await.map_err(rpc)?.as_u64();
        Ok(private_key
            .parse::<LocalWallet>()
            .map_err(|e| ChainError::InvalidKey(e.to_string()))?
            .with_chain_id(chain_id))
    }

    async fn funder(&self) -> Result<Arc<Funder>, ChainError> {
        self.funder
            .get_or_try_init(|| async {
                let admin = self.signer_for(&self.admin_key).await?;
                let admin_address = admin.address();
                let signer = SignerMiddleware::new(self.provider.clone(), admin);
                Ok(Arc::new(NonceManagerMiddleware::new(signer, admin_address)))
            })
            .await
            .cloned()
    }
}

/// Render the first event argument the way clients store property ids
fn token_to_id(token: &Token) -> Option<String> {
    match token {
        Token::FixedBytes(bytes) => Some(format!("0x{}", hex::encode(bytes))),
        Token::Uint(value) => {
            let mut word = [0u8; 32];
            value.to_big_endian(&mut word);
            Some(format!("0x{}", hex::encode(word)))
        }
        _ => None,
    }
}

#[async_trait]
impl Ledger for EthLedger {
    async fn status(&self) -> Result<ChainStatus, ChainError> {
        let chain_id = self.provider.get_chainid().await.map_err(rpc)?.as_u64();
        let network_id = self.provider.get_net_version().await.map_err(rpc)?;
        let block_number = self.provider.get_block_number().await.map_err(rpc)?.as_u64();
        Ok(ChainStatus {
            chain_id,
            network_id,
            block_number,
        })
    }

    async fn fund_wallet(&self, address: &str) -> Result<String, ChainError> {
        let to = Address::from_str(address)
            .map_err(|e| ChainError::InvalidAddress(format!("{}: {}", address, e)))?;
        let funder = self.funder().await?;

        let tx = TransactionRequest::pay(to, self.funding_amount);
        let pending = funder.send_transaction(tx, None).await.map_err(rpc)?;
        let tx_hash = format!("{:?}", pending.tx_hash());
        pending
            .await
            .map_err(rpc)?
            .ok_or_else(|| ChainError::Dropped(tx_hash.clone()))?;

        info!("[FUND] Funded {} in tx {}", address, tx_hash);
        Ok(tx_hash)
    }

    async fn register_property(
        &self,
        owner_key: &str,
        listing: &PropertyListing,
    ) -> Result<Registration, ChainError> {
        let artifact = self.artifacts.get(PROPERTY_REGISTRY)?;
        let deployment = artifact.deployment(self.artifacts.network_id())?;
        let registry_address = Address::from_str(&deployment.address)
            .map_err(|e| ChainError::InvalidAddress(format!("{}: {}", deployment.address, e)))?;

        let code = self
            .provider
            .get_code(registry_address, None)
            .await
            .map_err(rpc)?;
        if code.is_empty() {
            return Err(ChainError::NotDeployed(format!(
                "{} (no code at {:?})",
                PROPERTY_REGISTRY, registry_address
            )));
        }

        let owner = self.signer_for(owner_key).await?;
        let client = Arc::new(SignerMiddleware::new(self.provider.clone(), owner));
        let contract = Contract::new(registry_address, artifact.abi.clone(), client);

        let call = contract
            .method::<_, ()>(
                "registerProperty",
                (
                    listing.property_type.clone(),
                    listing.location.clone(),
                    U256::from(listing.price),
                    U256::from(listing.maintenance_fee),
                ),
            )
            .map_err(rpc)?;
        let pending = call.send().await.map_err(rpc)?;
        let tx_hash = format!("{:?}", pending.tx_hash());
        let receipt = pending
            .await
            .map_err(rpc)?
            .ok_or_else(|| ChainError::Dropped(tx_hash.clone()))?;

        let event = artifact.abi.event(REGISTERED_EVENT).map_err(rpc)?;
        for log in receipt.logs {
            let raw = RawLog {
                topics: log.topics.clone(),
                data: log.data.to_vec(),
            };
            // Logs from other contracts in the same receipt do not parse
            let Ok(parsed) = event.parse_log(raw) else { continue };
            if let Some(property_id) = parsed.params.first().and_then(|p| token_to_id(&p.value)) {
                return Ok(Registration {
                    property_id,
                    tx_hash,
                });
            }
        }
        Err(ChainError::MissingEvent(REGISTERED_EVENT.to_string()))
    }
}
