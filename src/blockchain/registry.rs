//! Static chain registry: chain id → [`ChainConfig`].

use std::collections::HashMap;

use crate::blockchain::models::{ChainConfig, ChainId, NativeCurrency};
use crate::error::{ApiError, Result};

#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<ChainId, ChainConfig>,
}

impl ChainRegistry {
    pub fn new(chains: impl IntoIterator<Item = ChainConfig>) -> Self {
        Self {
            chains: chains.into_iter().map(|c| (c.chain_id, c)).collect(),
        }
    }

    pub fn get(&self, chain_id: ChainId) -> Result<&ChainConfig> {
        self.chains
            .get(&chain_id)
            .ok_or(ApiError::UnknownChain(chain_id))
    }

    pub fn contains(&self, chain_id: ChainId) -> bool {
        self.chains.contains_key(&chain_id)
    }

    /// All chains, ordered by chain id.
    pub fn chains(&self) -> Vec<&ChainConfig> {
        let mut chains: Vec<_> = self.chains.values().collect();
        chains.sort_by_key(|c| c.chain_id);
        chains
    }
}

fn eth() -> NativeCurrency {
    NativeCurrency {
        name: "ETH".to_string(),
        symbol: "ETH".to_string(),
        decimals: 18,
    }
}

pub fn mainnet(rpc_url: impl Into<String>) -> ChainConfig {
    ChainConfig {
        chain_id: 1,
        name: "Ethereum Mainnet".to_string(),
        rpc_url: rpc_url.into(),
        wallet_rpc_url: "https://ethereum.publicnode.com".to_string(),
        native_currency: eth(),
    }
}

pub fn arbitrum(rpc_url: impl Into<String>) -> ChainConfig {
    ChainConfig {
        chain_id: 42161,
        name: "Arbitrum One".to_string(),
        rpc_url: rpc_url.into(),
        wallet_rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
        native_currency: eth(),
    }
}

pub fn gnosis(rpc_url: impl Into<String>) -> ChainConfig {
    ChainConfig {
        chain_id: 100,
        name: "Gnosis".to_string(),
        rpc_url: rpc_url.into(),
        wallet_rpc_url: "https://rpc.gnosischain.com".to_string(),
        native_currency: NativeCurrency {
            name: "xDAI".to_string(),
            symbol: "xDAI".to_string(),
            decimals: 18,
        },
    }
}
