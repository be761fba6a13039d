//! PropChain node
//!
//! REST backend for a real-estate marketplace: accounts with demo and
//! MetaMask wallets, property listings, an anonymous deposit queue per
//! property, rent and maintenance payment records, messaging and signed
//! contracts. Contract calls happen client side; the node funds demo wallets,
//! seeds listings on chain and stores the transaction hashes clients report.

pub mod api;
pub mod auth;
pub mod chain;
pub mod config;
pub mod db;
pub mod models;
pub mod seed;
pub mod storage;

pub use config::Config;
pub use db::Database;
