//! State-changing operations, signed by the wallet, scoped to one chain.

use std::sync::Arc;
use std::time::Duration;

use ethers::types::{Address, TransactionRequest, H256, U256, U64};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::blockchain::{
    models::{ChainId, TokenMetadata},
    services::token,
    tx_result::{catch_tx_errors, TxResult},
};
use crate::error::{ApiError, Result};
use crate::wallet::Eip1193Provider;

/// How mined-transaction waits are paced.
#[derive(Debug, Clone)]
pub struct TxSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for TxSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptStatus {
    #[serde(default)]
    status: Option<U64>,
}

/// Signer bound to the chain the wallet was on when it was built.
#[derive(Clone)]
pub struct SignerApi {
    chain_id: ChainId,
    address: Address,
    wallet: Arc<dyn Eip1193Provider>,
    settings: TxSettings,
}

impl std::fmt::Debug for SignerApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerApi")
            .field("chain_id", &self.chain_id)
            .field("address", &self.address)
            .finish()
    }
}

impl SignerApi {
    pub fn new(chain_id: ChainId, address: Address, wallet: Arc<dyn Eip1193Provider>, settings: TxSettings) -> Self {
        Self {
            chain_id,
            address,
            wallet,
            settings,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn ensure_chain(&self, token: &TokenMetadata) -> Result<()> {
        if token.chain_id() != self.chain_id {
            return Err(ApiError::ChainMismatch {
                signer: self.chain_id,
                token: token.chain_id(),
            });
        }
        Ok(())
    }

    /// Send `amount` of `token` to `to`.
    pub async fn transfer(&self, token: &TokenMetadata, to: Address, amount: U256) -> Result<TxResult<()>> {
        self.ensure_chain(token)?;
        let contract = token::parse_address(token.address())?;
        catch_tx_errors(self.send_and_confirm(token::erc20_transfer_tx(contract, to, amount))).await
    }

    /// Custody-contract operations against the store at `store`.
    pub fn custody(&self, store: Address) -> CustodySigner<'_> {
        CustodySigner { signer: self, store }
    }

    async fn send_and_confirm(&self, tx: TransactionRequest) -> Result<()> {
        let mut tx = serde_json::to_value(tx.from(self.address))
            .map_err(|e| ApiError::InvalidInput(format!("cannot encode transaction: {}", e)))?;
        // ethers leaves chainId out of the request; the wallet refuses a mismatch.
        if let Some(fields) = tx.as_object_mut() {
            fields.insert("chainId".to_string(), json!(U64::from(self.chain_id)));
        }
        let value = self.wallet.request("eth_sendTransaction", json!([tx])).await?;
        let hash: H256 = serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("eth_sendTransaction returned no hash: {}", e)))?;
        info!("Submitted transaction {:?} on chain {}", hash, self.chain_id);

        self.wait_for_receipt(hash).await?;
        info!("Transaction {:?} mined", hash);
        Ok(())
    }

    async fn wait_for_receipt(&self, hash: H256) -> Result<()> {
        tokio::time::timeout(self.settings.timeout, self.poll_receipt(hash))
            .await
            .map_err(|_| ApiError::ConfirmationTimeout(hash))?
    }

    async fn poll_receipt(&self, hash: H256) -> Result<()> {
        loop {
            let value = self
                .wallet
                .request("eth_getTransactionReceipt", json!([hash]))
                .await?;
            if !value.is_null() {
                let receipt: ReceiptStatus = serde_json::from_value(value)
                    .map_err(|e| ApiError::InvalidResponse(format!("bad receipt for {:?}: {}", hash, e)))?;
                return match receipt.status {
                    Some(status) if status.is_zero() => {
                        warn!("Transaction {:?} reverted", hash);
                        Err(ApiError::Reverted(hash))
                    }
                    _ => Ok(()),
                };
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

/// The custody-contract facing side of a [`SignerApi`].
pub struct CustodySigner<'a> {
    signer: &'a SignerApi,
    store: Address,
}

impl CustodySigner<'_> {
    pub fn store(&self) -> Address {
        self.store
    }

    /// Allow the store to pull `amount` of `token` from the signer.
    pub async fn approve(&self, token: &TokenMetadata, amount: U256) -> Result<TxResult<()>> {
        self.signer.ensure_chain(token)?;
        let contract = token::parse_address(token.address())?;
        let tx = token::erc20_approve_tx(contract, self.store, amount);
        catch_tx_errors(self.signer.send_and_confirm(tx)).await
    }

    /// Move `amount` of `token` into the store. Requires a prior approval.
    pub async fn deposit(&self, token: &TokenMetadata, amount: U256) -> Result<TxResult<()>> {
        self.signer.ensure_chain(token)?;
        let contract = token::parse_address(token.address())?;
        let tx = token::store_deposit_tx(self.store, contract, amount);
        catch_tx_errors(self.signer.send_and_confirm(tx)).await
    }

    pub async fn withdraw(&self, token: &TokenMetadata, amount: U256) -> Result<TxResult<()>> {
        self.signer.ensure_chain(token)?;
        let contract = token::parse_address(token.address())?;
        let tx = token::store_withdraw_tx(self.store, contract, amount);
        catch_tx_errors(self.signer.send_and_confirm(tx)).await
    }
}
