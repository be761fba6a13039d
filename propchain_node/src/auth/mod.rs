//! Account security: password hashing, session tokens and wallet helpers

pub mod password;
pub mod token;
pub mod wallet;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenIssuer};
pub use wallet::{generate_wallet, is_valid_address, keccak_id, GeneratedWallet};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("{0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
