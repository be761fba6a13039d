use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use ethers::utils::{keccak256, to_checksum};
use std::str::FromStr;

/// Freshly generated demo wallet
#[derive(Debug, Clone)]
pub struct GeneratedWallet {
    /// Lowercase 0x-prefixed address
    pub address: String,
    /// 0x-prefixed secp256k1 secret
    pub private_key: String,
}

pub fn generate_wallet() -> GeneratedWallet {
    let wallet = LocalWallet::new(&mut rand::thread_rng());
    GeneratedWallet {
        address: format!("{:?}", wallet.address()),
        private_key: format!("0x{}", hex::encode(wallet.signer().to_bytes())),
    }
}

/// 0x followed by 40 hex digits. Mixed-case input must carry a valid EIP-55
/// checksum; all-lowercase or all-uppercase input is accepted as-is.
pub fn is_valid_address(address: &str) -> bool {
    let Some(digits) = address.strip_prefix("0x") else {
        return false;
    };
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }
    match Address::from_str(address) {
        Ok(parsed) => to_checksum(&parsed, None) == address,
        Err(_) => false,
    }
}

/// keccak256 of the UTF-8 text as 0x-hex, used for client-visible ids
pub fn keccak_id(text: &str) -> String {
    format!("0x{}", hex::encode(keccak256(text.as_bytes())))
}
