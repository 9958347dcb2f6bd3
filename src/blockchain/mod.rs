// src/blockchain/mod.rs

pub mod models;
pub mod provider_api;
pub mod provider_pool;
pub mod registry;
pub mod services;
pub mod signer;
pub mod tx_result;
pub mod wallet_manager;

// Re-export commonly used types
pub use provider_api::ProviderApi;
pub use provider_pool::ProviderPool;
pub use registry::ChainRegistry;
pub use signer::{CustodySigner, SignerApi};
pub use tx_result::{catch_tx_errors, TxResult};
pub use wallet_manager::{WalletConnection, WalletSession};
