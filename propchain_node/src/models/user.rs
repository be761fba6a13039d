use crate::storage::{new_object_id, Document, Timestamps};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    Demo,
    Metamask,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub address: String,
    pub alias: String,
    pub wallet_type: WalletType,
    /// Only demo wallets carry a key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

/// Account record as stored, including the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
    pub roles: Vec<String>,
    #[serde(default)]
    pub wallets: Vec<Wallet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_wallet: Option<String>,
    pub last_login_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn unique_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("username", Some(self.username.clone())),
            ("email", self.email.clone()),
        ]
    }
}

impl User {
    pub fn new(username: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: new_object_id(),
            username: username.trim().to_string(),
            email: None,
            password: password_hash,
            roles: vec!["tenant".to_string()],
            wallets: Vec::new(),
            active_wallet: None,
            last_login_at: now,
            last_active_at: now,
            timestamps: Timestamps::now(),
        }
    }

    pub fn wallet_addresses(&self) -> Vec<String> {
        self.wallets.iter().map(|w| w.address.to_lowercase()).collect()
    }

    pub fn owns_wallet(&self, address: &str) -> bool {
        let address = address.to_lowercase();
        self.wallets.iter().any(|w| w.address == address)
    }

    /// Append a wallet; the first one added becomes active
    pub fn add_wallet(&mut self, wallet: Wallet) {
        if self.active_wallet.is_none() {
            self.active_wallet = Some(wallet.address.clone());
        }
        self.wallets.push(wallet);
    }

    /// Remove a wallet, falling back to the first remaining one if it was active.
    /// Returns false when the address is not on the account.
    pub fn remove_wallet(&mut self, address: &str) -> bool {
        let address = address.to_lowercase();
        let Some(index) = self.wallets.iter().position(|w| w.address == address) else {
            return false;
        };
        self.wallets.remove(index);
        if self.active_wallet.as_deref() == Some(address.as_str()) {
            self.active_wallet = self.wallets.first().map(|w| w.address.clone());
        }
        true
    }

    /// Client-facing projection; private keys are included only on request
    pub fn view(&self, with_keys: bool) -> UserView {
        UserView {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            roles: self.roles.clone(),
            wallets: self
                .wallets
                .iter()
                .map(|w| WalletView {
                    address: w.address.clone(),
                    alias: w.alias.clone(),
                    wallet_type: w.wallet_type,
                    private_key: if with_keys { w.private_key.clone() } else { None },
                })
                .collect(),
            active_wallet: self.active_wallet.clone(),
            last_login_at: self.last_login_at,
            last_active_at: self.last_active_at,
            timestamps: self.timestamps.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub address: String,
    pub alias: String,
    pub wallet_type: WalletType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub wallets: Vec<WalletView>,
    pub active_wallet: Option<String>,
    pub last_login_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(address: &str) -> Wallet {
        Wallet {
            address: address.to_string(),
            alias: "w".to_string(),
            wallet_type: WalletType::Demo,
            private_key: Some("0xkey".to_string()),
        }
    }

    #[test]
    fn test_first_wallet_becomes_active() {
        let mut user = User::new("alice", "hash".into());
        user.add_wallet(wallet("0xaa"));
        user.add_wallet(wallet("0xbb"));
        assert_eq!(user.active_wallet.as_deref(), Some("0xaa"));
    }

    #[test]
    fn test_removing_active_wallet_falls_back() {
        let mut user = User::new("alice", "hash".into());
        user.add_wallet(wallet("0xaa"));
        user.add_wallet(wallet("0xbb"));

        assert!(user.remove_wallet("0xAA"));
        assert_eq!(user.active_wallet.as_deref(), Some("0xbb"));
        assert!(user.remove_wallet("0xbb"));
        assert_eq!(user.active_wallet, None);
        assert!(!user.remove_wallet("0xbb"));
    }

    #[test]
    fn test_view_hides_password_and_keys() {
        let mut user = User::new("alice", "secret-hash".into());
        user.add_wallet(wallet("0xaa"));

        let json = serde_json::to_value(user.view(false)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json["wallets"][0].get("privateKey").is_none());
        assert_eq!(json["activeWallet"], "0xaa");
        assert!(json.get("_id").is_some());
        assert!(json.get("createdAt").is_some());

        let json = serde_json::to_value(user.view(true)).unwrap();
        assert_eq!(json["wallets"][0]["privateKey"], "0xkey");
    }
}
