//! Read-only queries against any configured chain.
//!
//! Every read resolves its connection through the [`ProviderPool`], so an
//! unknown chain fails with [`ApiError::UnknownChain`] before anything goes
//! over the wire. Amounts are returned as raw integers in the asset's
//! smallest unit; scaling by decimals is left to the presentation layer.

use std::sync::Arc;

use dashmap::DashMap;
use ethers::{
    providers::{Http, JsonRpcClient, Middleware},
    types::{Address, Bytes, TransactionRequest, U256},
    utils::to_checksum,
};
use futures::future::try_join_all;
use tracing::debug;

use crate::blockchain::{
    models::{Asset, Balance, ChainId, StoreTokenBalance, TokenConfig, TokenMetadata},
    provider_pool::ProviderPool,
    registry::ChainRegistry,
    services::token,
};
use crate::error::{ApiError, Result};

pub struct ProviderApi<P: JsonRpcClient = Http> {
    pool: ProviderPool<P>,
    metadata: DashMap<TokenConfig, TokenMetadata>,
}

impl ProviderApi<Http> {
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self::with_pool(ProviderPool::new(registry))
    }
}

impl<P: JsonRpcClient + 'static> ProviderApi<P> {
    pub fn with_pool(pool: ProviderPool<P>) -> Self {
        Self {
            pool,
            metadata: DashMap::new(),
        }
    }

    pub fn pool(&self) -> &ProviderPool<P> {
        &self.pool
    }

    pub fn registry(&self) -> &ChainRegistry {
        self.pool.registry()
    }

    async fn eth_call(&self, chain_id: ChainId, to: Address, from: Option<Address>, data: Bytes) -> Result<Bytes> {
        let provider = self.pool.get_provider(chain_id)?;
        let mut tx = TransactionRequest::new().to(to).data(data);
        if let Some(from) = from {
            tx = tx.from(from);
        }
        provider
            .call(&tx.into(), None)
            .await
            .map_err(|e| ApiError::network(chain_id, e))
    }

    /// Native currency balance of `address`, in wei.
    pub async fn get_native_balance(&self, chain_id: ChainId, address: Address) -> Result<U256> {
        let provider = self.pool.get_provider(chain_id)?;
        provider
            .get_balance(address, None)
            .await
            .map_err(|e| ApiError::network(chain_id, e))
    }

    /// Symbol, name and decimals of an ERC20 token. Fetched once per token,
    /// then served from the session cache.
    pub async fn get_token_metadata(&self, config: &TokenConfig) -> Result<TokenMetadata> {
        let cached = self.metadata.get(config).map(|m| m.value().clone());
        if let Some(metadata) = cached {
            return Ok(metadata);
        }

        let address = token::parse_address(&config.address)?;
        let chain_id = config.chain_id;
        let symbol = token::decode_string(&self.eth_call(chain_id, address, None, token::symbol_call()).await?)?;
        let name = token::decode_string(&self.eth_call(chain_id, address, None, token::name_call()).await?)?;
        let decimals = token::decode_decimals(&self.eth_call(chain_id, address, None, token::decimals_call()).await?)?;

        let metadata = TokenMetadata {
            config: config.clone(),
            symbol,
            name,
            decimals,
        };
        debug!("Fetched metadata for {} on chain {}: {}", config.address, chain_id, metadata.symbol);
        self.metadata.insert(config.clone(), metadata.clone());
        Ok(metadata)
    }

    pub async fn get_token_supply(&self, token: &TokenMetadata) -> Result<U256> {
        let address = token::parse_address(token.address())?;
        let raw = self
            .eth_call(token.chain_id(), address, None, token::total_supply_call())
            .await?;
        token::decode_u256(&raw)
    }

    pub async fn get_token_balance(&self, token: &TokenMetadata, owner: Address) -> Result<U256> {
        let address = token::parse_address(token.address())?;
        let raw = self
            .eth_call(token.chain_id(), address, None, token::balance_of_call(owner))
            .await?;
        token::decode_u256(&raw)
    }

    /// The custody contract's balances for `owner`, in contract order.
    pub async fn get_store_balances(
        &self,
        chain_id: ChainId,
        store: Address,
        owner: Address,
    ) -> Result<Vec<StoreTokenBalance>> {
        let raw = self
            .eth_call(chain_id, store, Some(owner), token::store_get_balances_call())
            .await?;

        let mut balances = Vec::new();
        for (address, balance) in token::decode_store_balances(&raw)? {
            let config = TokenConfig::new(to_checksum(&address, None), chain_id);
            let token = self.get_token_metadata(&config).await?;
            balances.push(StoreTokenBalance { token, balance });
        }
        Ok(balances)
    }

    /// Native balance on every registered chain, then the balance of each
    /// listed token. Always refetched.
    pub async fn get_balances(&self, owner: Address, tokens: &[TokenConfig]) -> Result<Vec<Balance>> {
        let natives = try_join_all(self.registry().chains().into_iter().map(|chain| async move {
            let amount = self.get_native_balance(chain.chain_id, owner).await?;
            Ok::<_, ApiError>(Balance {
                owner,
                asset: Asset::Native {
                    chain_id: chain.chain_id,
                    currency: chain.native_currency.clone(),
                },
                amount,
            })
        }))
        .await?;

        let erc20s = try_join_all(tokens.iter().map(|config| async move {
            let metadata = self.get_token_metadata(config).await?;
            let amount = self.get_token_balance(&metadata, owner).await?;
            Ok::<_, ApiError>(Balance {
                owner,
                asset: Asset::Token(metadata),
                amount,
            })
        }))
        .await?;

        Ok(natives.into_iter().chain(erc20s).collect())
    }
}
