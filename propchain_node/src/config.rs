//! Node configuration
//!
//! Layers, lowest to highest precedence: built-in defaults, an optional YAML
//! file, then environment variables (`PORT`, `JWT_SECRET`, `BLOCKCHAIN_URL`,
//! `ADMIN_PRIVATE_KEY`, `CONTRACTS_DIR`, ...).

use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Ganache deterministic account #0
pub const GANACHE_ADMIN_KEY: &str =
    "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d";

pub const DEFAULT_CONFIG_PATH: &str = "config/propchain.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    /// HMAC key for session tokens; must be set
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub blockchain_url: String,
    pub admin_private_key: String,
    /// Directory holding the Truffle build artifacts
    pub contracts_dir: PathBuf,
    /// Artifact network preferred when several deployments are listed
    pub network_id: String,
    /// RocksDB directory (only read with the `rocksdb` feature)
    pub data_dir: PathBuf,
    pub funding_amount_eth: u64,
    pub chain_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            jwt_secret: String::new(),
            jwt_expiry_hours: 24,
            blockchain_url: "http://localhost:8545".to_string(),
            admin_private_key: GANACHE_ADMIN_KEY.to_string(),
            contracts_dir: PathBuf::from("../blockchain/build/contracts"),
            network_id: "5777".to_string(),
            data_dir: PathBuf::from("data"),
            funding_amount_eth: 100,
            chain_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration. An explicit `path` must exist; otherwise
    /// `config/propchain.yaml` is read when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let config: Config = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(file)
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("JWT_SECRET must be set".to_string()));
        }
        if self.jwt_expiry_hours <= 0 {
            return Err(ConfigError::Invalid(
                "jwt_expiry_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_require_secret() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.jwt_expiry_hours, 24);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "jwt_secret: from-file").unwrap();
        writeln!(file, "funding_amount_eth: 5").unwrap();
        writeln!(file, "chain_enabled: false").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.funding_amount_eth, 5);
        assert!(!config.chain_enabled);
        assert_eq!(config.network_id, "5777");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/propchain.yaml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
