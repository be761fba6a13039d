use super::{ChainError, DEPOSIT_QUEUE, MAINTENANCE_FEE, PROPERTY_REGISTRY, RENT_PAYMENT};
use ethers::abi::Abi;
use log::{info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const KNOWN_CONTRACTS: [&str; 4] = [PROPERTY_REGISTRY, DEPOSIT_QUEUE, MAINTENANCE_FEE, RENT_PAYMENT];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub address: String,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

/// Truffle build output for one contract
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    pub abi: Abi,
    #[serde(default)]
    pub networks: BTreeMap<String, Deployment>,
}

impl ContractArtifact {
    pub fn from_json(json: &str) -> Result<Self, ChainError> {
        serde_json::from_str(json).map_err(|e| ChainError::InvalidArtifact(e.to_string()))
    }

    /// Deployment on `preferred` if listed, otherwise the first listed network
    pub fn deployment(&self, preferred: &str) -> Result<&Deployment, ChainError> {
        self.networks
            .get(preferred)
            .or_else(|| self.networks.values().next())
            .ok_or_else(|| ChainError::NotDeployed(self.contract_name.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    network_id: String,
    artifacts: BTreeMap<String, ContractArtifact>,
}

impl ArtifactRegistry {
    pub fn new(network_id: &str) -> Self {
        Self {
            network_id: network_id.to_string(),
            artifacts: BTreeMap::new(),
        }
    }

    /// Load every known contract from `dir`. Missing or unreadable artifacts are
    /// logged and skipped.
    pub fn load(dir: &Path, network_id: &str) -> Self {
        let mut registry = Self::new(network_id);
        for name in KNOWN_CONTRACTS {
            let path = dir.join(format!("{}.json", name));
            let loaded = std::fs::read_to_string(&path)
                .map_err(|e| ChainError::InvalidArtifact(format!("{}: {}", path.display(), e)))
                .and_then(|json| ContractArtifact::from_json(&json));
            match loaded {
                Ok(artifact) => {
                    info!("[CHAIN] Loaded artifact {}", name);
                    registry.insert(artifact);
                }
                Err(e) => warn!("[CHAIN] Skipping artifact {}: {}", name, e),
            }
        }
        registry
    }

    pub fn insert(&mut self, artifact: ContractArtifact) {
        self.artifacts.insert(artifact.contract_name.clone(), artifact);
    }

    pub fn get(&self, name: &str) -> Result<&ContractArtifact, ChainError> {
        self.artifacts
            .get(name)
            .ok_or_else(|| ChainError::MissingArtifact(name.to_string()))
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    /// Deployed address of every loaded contract that has one
    pub fn addresses(&self) -> BTreeMap<String, String> {
        self.artifacts
            .iter()
            .filter_map(|(name, artifact)| {
                artifact
                    .deployment(&self.network_id)
                    .ok()
                    .map(|d| (name.clone(), d.address.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY_JSON: &str = r#"{
        "contractName": "PropertyRegistry",
        "abi": [
            {
                "type": "event",
                "name": "PropertyRegistered",
                "anonymous": false,
                "inputs": [
                    {"name": "propertyId", "type": "bytes32", "indexed": true},
                    {"name": "owner", "type": "address", "indexed": true}
                ]
            }
        ],
        "networks": {
            "1337": {"address": "0x1111111111111111111111111111111111111111"},
            "5777": {"address": "0x2222222222222222222222222222222222222222", "transactionHash": "0xabc"}
        }
    }"#;

    #[test]
    fn test_preferred_network_wins() {
        let artifact = ContractArtifact::from_json(REGISTRY_JSON).unwrap();
        let deployment = artifact.deployment("5777").unwrap();
        assert_eq!(deployment.address, "0x2222222222222222222222222222222222222222");
        assert_eq!(deployment.transaction_hash.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_falls_back_to_first_network() {
        let artifact = ContractArtifact::from_json(REGISTRY_JSON).unwrap();
        let deployment = artifact.deployment("42").unwrap();
        assert_eq!(deployment.address, "0x1111111111111111111111111111111111111111");
    }

    #[test]
    fn test_undeployed_artifact() {
        let artifact = ContractArtifact::from_json(
            r#"{"contractName": "DepositQueue", "abi": [], "networks": {}}"#,
        )
        .unwrap();
        assert!(matches!(artifact.deployment("5777"), Err(ChainError::NotDeployed(name)) if name == "DepositQueue"));
    }

    #[test]
    fn test_load_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("PropertyRegistry.json"), REGISTRY_JSON).unwrap();
        std::fs::write(dir.path().join("RentPayment.json"), "{ not json").unwrap();

        let registry = ArtifactRegistry::load(dir.path(), "5777");
        assert!(registry.get(PROPERTY_REGISTRY).is_ok());
        assert!(matches!(registry.get(RENT_PAYMENT), Err(ChainError::MissingArtifact(_))));

        let addresses = registry.addresses();
        assert_eq!(addresses.len(), 1);
        assert_eq!(
            addresses.get(PROPERTY_REGISTRY).map(String::as_str),
            Some("0x2222222222222222222222222222222222222222")
        );
    }
}
