//! Wallet connection manager: the single source of truth for which account
//! is connected and on which chain.

use std::sync::Arc;

use ethers::types::{Address, U64};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{info, warn};

use crate::{
    blockchain::{
        models::{ChainConfig, ChainId},
        registry::ChainRegistry,
        signer::{SignerApi, TxSettings},
    },
    error::{ApiError, Result},
    wallet::{Eip1193Provider, WalletError},
};

/// The connected account and the signer for the chain it is on. The chain id
/// is the signer's, so the two can never disagree.
#[derive(Debug)]
pub struct WalletConnection {
    address: Address,
    signer: SignerApi,
}

impl WalletConnection {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> ChainId {
        self.signer.chain_id()
    }

    pub fn signer(&self) -> &SignerApi {
        &self.signer
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            address: self.address,
            chain_id: self.chain_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub address: Address,
    pub chain_id: ChainId,
}

/// Owns the session's wallet connection.
pub struct WalletSession {
    wallet: Option<Arc<dyn Eip1193Provider>>,
    registry: Arc<ChainRegistry>,
    settings: TxSettings,
    connection: RwLock<Option<Arc<WalletConnection>>>,
    /// Serializes `connect` calls so chain switches never overlap.
    connecting: Mutex<()>,
}

impl WalletSession {
    /// Create a session. `wallet` is `None` when no wallet is available.
    pub fn new(wallet: Option<Arc<dyn Eip1193Provider>>, registry: Arc<ChainRegistry>, settings: TxSettings) -> Self {
        Self {
            wallet,
            registry,
            settings,
            connection: RwLock::new(None),
            connecting: Mutex::new(()),
        }
    }

    /// The currently published connection, if any.
    pub async fn current(&self) -> Option<Arc<WalletConnection>> {
        self.connection.read().await.clone()
    }

    pub async fn disconnect(&self) {
        let _guard = self.connecting.lock().await;
        if self.connection.write().await.take().is_some() {
            info!("Wallet disconnected");
        }
    }

    /// Connect to the wallet, switching it to `desired_chain` first when given.
    pub async fn connect(&self, desired_chain: Option<ChainId>) -> Result<Arc<WalletConnection>> {
        let wallet = self.wallet.as_ref().ok_or(ApiError::NoWalletExtension)?;
        let _guard = self.connecting.lock().await;
        self.connect_locked(wallet, desired_chain).await
    }

    /// Connect on `chain_id` and keep the wallet there until the lease is
    /// dropped. Other connects wait, so signed work under the lease cannot
    /// have the chain switched underneath it.
    pub async fn lease(&self, chain_id: ChainId) -> Result<ChainLease<'_>> {
        let wallet = self.wallet.as_ref().ok_or(ApiError::NoWalletExtension)?;
        let guard = self.connecting.lock().await;
        let connection = self.connect_locked(wallet, Some(chain_id)).await?;
        Ok(ChainLease {
            _guard: guard,
            connection,
        })
    }

    async fn connect_locked(
        &self,
        wallet: &Arc<dyn Eip1193Provider>,
        desired_chain: Option<ChainId>,
    ) -> Result<Arc<WalletConnection>> {
        wallet
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(|e| {
                if e.is_user_rejection() {
                    ApiError::UserRejectedConnection
                } else {
                    ApiError::Wallet(e)
                }
            })?;

        let mut chain_id = read_chain_id(wallet.as_ref()).await?;

        if let Some(target) = desired_chain.filter(|target| *target != chain_id) {
            let chain = self.registry.get(target)?;
            switch_to_chain(wallet.as_ref(), chain).await?;
            chain_id = target;
        }

        let address = read_address(wallet.as_ref()).await?;

        let mut slot = self.connection.write().await;
        if let Some(existing) = slot.as_ref() {
            if existing.chain_id() == chain_id && existing.address() == address {
                return Ok(existing.clone());
            }
        }

        let connection = Arc::new(WalletConnection {
            address,
            signer: SignerApi::new(chain_id, address, wallet.clone(), self.settings.clone()),
        });
        *slot = Some(connection.clone());
        info!("Wallet connected: {:?} on chain {}", address, chain_id);
        Ok(connection)
    }
}

/// Exclusive use of the wallet on one chain. See [`WalletSession::lease`].
pub struct ChainLease<'a> {
    _guard: MutexGuard<'a, ()>,
    connection: Arc<WalletConnection>,
}

impl ChainLease<'_> {
    pub fn connection(&self) -> &Arc<WalletConnection> {
        &self.connection
    }

    pub fn signer(&self) -> &SignerApi {
        self.connection.signer()
    }
}

async fn read_chain_id(wallet: &dyn Eip1193Provider) -> Result<ChainId> {
    let value = wallet.request("eth_chainId", json!([])).await?;
    let chain_id: U64 = serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("bad eth_chainId result: {}", e)))?;
    Ok(chain_id.as_u64())
}

async fn read_address(wallet: &dyn Eip1193Provider) -> Result<Address> {
    let value = wallet.request("eth_accounts", json!([])).await?;
    let accounts: Vec<Address> = serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("bad eth_accounts result: {}", e)))?;
    // An empty list means the user has not granted access to any account.
    accounts.into_iter().next().ok_or(ApiError::UserRejectedConnection)
}

fn hex_chain_id(chain_id: ChainId) -> String {
    format!("0x{:x}", chain_id)
}

fn add_chain_params(chain: &ChainConfig) -> Value {
    json!([{
        "chainId": hex_chain_id(chain.chain_id),
        "chainName": chain.name,
        "rpcUrls": [chain.wallet_rpc_url],
        "nativeCurrency": chain.native_currency,
    }])
}

fn switch_failed(chain: &ChainConfig, e: WalletError) -> ApiError {
    ApiError::ChainSwitchFailed {
        chain_id: chain.chain_id,
        reason: e.to_string(),
    }
}

/// Ask the wallet to switch to `chain`, registering the chain with the
/// wallet first if it does not know it.
async fn switch_to_chain(wallet: &dyn Eip1193Provider, chain: &ChainConfig) -> Result<()> {
    info!("Switching to {} (id {})", chain.name, chain.chain_id);
    let params = json!([{ "chainId": hex_chain_id(chain.chain_id) }]);

    match wallet.request("wallet_switchEthereumChain", params.clone()).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_unrecognized_chain() => {
            warn!("Wallet does not know chain {}, adding it", chain.chain_id);
            wallet
                .request("wallet_addEthereumChain", add_chain_params(chain))
                .await
                .map_err(|e| switch_failed(chain, e))?;
            wallet
                .request("wallet_switchEthereumChain", params)
                .await
                .map_err(|e| switch_failed(chain, e))?;
            Ok(())
        }
        Err(e) => Err(switch_failed(chain, e)),
    }
}
