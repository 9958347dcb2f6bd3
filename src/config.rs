// src/config.rs

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ethers::types::Address;
use url::Url;

use crate::blockchain::models::{ChainConfig, ChainId, StoreDeployment, TokenConfig};
use crate::blockchain::registry::{arbitrum, gnosis, mainnet, ChainRegistry};
use crate::blockchain::signer::TxSettings;

const DEFAULT_MAINNET_RPC_URL: &str = "https://ethereum.publicnode.com";
const DEFAULT_ARBITRUM_RPC_URL: &str = "https://arb1.arbitrum.io/rpc";
const DEFAULT_GNOSIS_RPC_URL: &str = "https://rpc.gnosischain.com";

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    /// Networks the dapp can read from and ask the wallet to switch to.
    pub chains: Vec<ChainConfig>,
    /// Tokens listed in the balance summary.
    pub tokens: Vec<TokenConfig>,
    /// The custody contract.
    pub store: StoreDeployment,

    /// JSON-RPC endpoint of the user's wallet. Without one, connecting fails.
    pub wallet_rpc_url: Option<String>,

    // Transaction settings
    pub tx_poll_interval_ms: u64,
    pub tx_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            chains: default_chains(
                DEFAULT_MAINNET_RPC_URL.to_string(),
                DEFAULT_ARBITRUM_RPC_URL.to_string(),
                DEFAULT_GNOSIS_RPC_URL.to_string(),
            ),
            tokens: default_tokens(),
            store: StoreDeployment {
                chain_id: 1,
                address: Address::zero(),
            },
            wallet_rpc_url: None,
            tx_poll_interval_ms: 1000,
            tx_timeout_secs: 600,
        }
    }
}

impl Config {
    pub fn registry(&self) -> ChainRegistry {
        ChainRegistry::new(self.chains.iter().cloned())
    }

    pub fn tx_settings(&self) -> TxSettings {
        TxSettings {
            poll_interval: Duration::from_millis(self.tx_poll_interval_ms),
            timeout: Duration::from_secs(self.tx_timeout_secs),
        }
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();

        let chains = match env::var("CHAINS") {
            Ok(json) => serde_json::from_str(&json).context("CHAINS must be a JSON array of chain configs")?,
            Err(_) => default_chains(
                env::var("MAINNET_RPC_URL").unwrap_or_else(|_| DEFAULT_MAINNET_RPC_URL.to_string()),
                env::var("ARBITRUM_RPC_URL").unwrap_or_else(|_| DEFAULT_ARBITRUM_RPC_URL.to_string()),
                env::var("GNOSIS_RPC_URL").unwrap_or_else(|_| DEFAULT_GNOSIS_RPC_URL.to_string()),
            ),
        };

        let tokens = match env::var("TOKENS") {
            Ok(json) => serde_json::from_str(&json).context("TOKENS must be a JSON array of token configs")?,
            Err(_) => default_tokens(),
        };

        let store_address = env::var("TOKEN_STORE_ADDRESS")
            .context("TOKEN_STORE_ADDRESS must be set to the custody contract address")?
            .parse::<Address>()
            .context("TOKEN_STORE_ADDRESS must be a hex address")?;
        let store_chain_id = env::var("TOKEN_STORE_CHAIN_ID")
            .unwrap_or_else(|_| "1".to_string())
            .parse::<ChainId>()
            .context("TOKEN_STORE_CHAIN_ID must be a valid number")?;

        let config = Config {
            // Server settings
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,

            chains,
            tokens,
            store: StoreDeployment {
                chain_id: store_chain_id,
                address: store_address,
            },
            wallet_rpc_url: env::var("WALLET_RPC_URL").ok(),

            // Transaction settings
            tx_poll_interval_ms: env::var("TX_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("TX_POLL_INTERVAL_MS must be a valid number")?,
            tx_timeout_secs: env::var("TX_TIMEOUT_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .context("TX_TIMEOUT_SECS must be a valid number")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every URL parses and that all chain references resolve.
    pub fn validate(&self) -> Result<()> {
        for chain in &self.chains {
            Url::parse(&chain.rpc_url).with_context(|| format!("invalid rpc url for chain {}", chain.chain_id))?;
            Url::parse(&chain.wallet_rpc_url)
                .with_context(|| format!("invalid wallet rpc url for chain {}", chain.chain_id))?;
        }
        if let Some(url) = &self.wallet_rpc_url {
            Url::parse(url).context("WALLET_RPC_URL must be a valid URL")?;
        }

        let registry = self.registry();
        if !registry.contains(self.store.chain_id) {
            bail!("TOKEN_STORE_CHAIN_ID {} is not a configured chain", self.store.chain_id);
        }
        if let Some(token) = self.tokens.iter().find(|t| !registry.contains(t.chain_id)) {
            bail!("token {} refers to unconfigured chain {}", token.address, token.chain_id);
        }
        Ok(())
    }
}

fn default_chains(mainnet_rpc: String, arbitrum_rpc: String, gnosis_rpc: String) -> Vec<ChainConfig> {
    vec![mainnet(mainnet_rpc), arbitrum(arbitrum_rpc), gnosis(gnosis_rpc)]
}

fn default_tokens() -> Vec<TokenConfig> {
    vec![
        TokenConfig::new("0x6B175474E89094C44Da98b954EedeAC495271d0F", 1),
        TokenConfig::new("0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1", 42161),
        TokenConfig::new("0x44fA8E6f47987339850636F88629646662444217", 100),
    ]
}
