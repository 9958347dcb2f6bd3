// src/lib.rs

use std::sync::Arc;

// Re-export commonly used types
pub use ethers::types::{Address, H256, U256, U64};

// Re-export modules
pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod fields;
pub mod flow;
pub mod wallet;

use blockchain::{provider_api::ProviderApi, wallet_manager::WalletSession};
use flow::{FlowController, SendController};
use wallet::{Eip1193Provider, HttpWallet};

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::Config>,
    /// Read-only access to every configured chain
    pub providers: Arc<ProviderApi>,
    /// The user's wallet connection
    pub wallet: Arc<WalletSession>,
    /// Deposit/withdraw flow
    pub flow: Arc<FlowController>,
    /// Send flow
    pub send: Arc<SendController>,
}

impl AppState {
    /// Build the state, talking to the wallet at `WALLET_RPC_URL` if one is configured.
    pub fn from_config(config: config::Config) -> Self {
        let wallet = config
            .wallet_rpc_url
            .clone()
            .map(|url| Arc::new(HttpWallet::new(url)) as Arc<dyn Eip1193Provider>);
        Self::with_wallet(config, wallet)
    }

    pub fn with_wallet(config: config::Config, wallet: Option<Arc<dyn Eip1193Provider>>) -> Self {
        let registry = Arc::new(config.registry());
        let providers = Arc::new(ProviderApi::new(registry.clone()));
        let wallet = Arc::new(WalletSession::new(wallet, registry, config.tx_settings()));
        let flow = Arc::new(FlowController::new(providers.clone(), wallet.clone(), config.store));
        let send = Arc::new(SendController::new(providers.clone(), wallet.clone()));

        Self {
            config: Arc::new(config),
            providers,
            wallet,
            flow,
            send,
        }
    }
}
