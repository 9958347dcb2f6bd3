// src/blockchain/models.rs

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Integer identifying an EVM network.
pub type ChainId = u64;

// --- Chain Models ---

/// Metadata of a chain's native currency, in the shape `wallet_addEthereumChain` expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Static configuration for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub name: String,
    /// Endpoint used for read-only connections.
    pub rpc_url: String,
    /// Endpoint handed to the wallet when it has to register the chain.
    pub wallet_rpc_url: String,
    pub native_currency: NativeCurrency,
}

// --- Token Models ---

/// Identifies an ERC20 contract on a given chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    /// Contract address as configured (case is preserved and significant).
    pub address: String,
    pub chain_id: ChainId,
}

impl TokenConfig {
    pub fn new(address: impl Into<String>, chain_id: ChainId) -> Self {
        Self {
            address: address.into(),
            chain_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub config: TokenConfig,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl TokenMetadata {
    pub fn chain_id(&self) -> ChainId {
        self.config.chain_id
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }
}

// --- Balance Models ---

/// What a balance is denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Asset {
    Native {
        chain_id: ChainId,
        currency: NativeCurrency,
    },
    Token(TokenMetadata),
}

impl Asset {
    pub fn decimals(&self) -> u8 {
        match self {
            Asset::Native { currency, .. } => currency.decimals,
            Asset::Token(token) => token.decimals,
        }
    }
}

/// An amount in the smallest unit of its asset, as of the read that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub owner: Address,
    pub asset: Asset,
    pub amount: U256,
}

/// One row of the custody contract's `getBalances()` for the calling account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTokenBalance {
    pub token: TokenMetadata,
    pub balance: U256,
}

/// Where the custody contract is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDeployment {
    pub chain_id: ChainId,
    pub address: Address,
}
