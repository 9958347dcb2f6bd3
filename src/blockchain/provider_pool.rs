//! Lazily created, cached read-only connections, one per chain.

use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use ethers_providers::{Http, JsonRpcClient, Provider};
use tracing::debug;

use crate::blockchain::models::{ChainConfig, ChainId};
use crate::blockchain::registry::ChainRegistry;
use crate::error::{ApiError, Result};

type Connector<P> = dyn Fn(&ChainConfig) -> Result<Provider<P>> + Send + Sync;

/// Read-only connections keyed by chain id.
///
/// A connection is built the first time its chain is asked for and then
/// handed out (as the same `Arc`) for the rest of the session. Chains that
/// are not in the registry are refused before any connection is attempted.
pub struct ProviderPool<P: JsonRpcClient = Http> {
    registry: Arc<ChainRegistry>,
    providers: DashMap<ChainId, Arc<Provider<P>>>,
    connect: Box<Connector<P>>,
}

impl ProviderPool<Http> {
    /// Pool of HTTP providers built from each chain's `rpc_url`.
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self::with_connector(registry, create_provider)
    }
}

impl<P: JsonRpcClient + 'static> ProviderPool<P> {
    pub fn with_connector<F>(registry: Arc<ChainRegistry>, connect: F) -> Self
    where
        F: Fn(&ChainConfig) -> Result<Provider<P>> + Send + Sync + 'static,
    {
        Self {
            registry,
            providers: DashMap::new(),
            connect: Box::new(connect),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Get the provider for the specified chain, connecting on first use.
    pub fn get_provider(&self, chain_id: ChainId) -> Result<Arc<Provider<P>>> {
        let chain = self.registry.get(chain_id)?;
        match self.providers.entry(chain_id) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let provider = Arc::new((self.connect)(chain)?);
                debug!("Created provider for {} (chain {})", chain.name, chain_id);
                entry.insert(provider.clone());
                Ok(provider)
            }
        }
    }
}

/// Create an HTTP provider for the given chain
pub fn create_provider(chain: &ChainConfig) -> Result<Provider<Http>> {
    Provider::<Http>::try_from(chain.rpc_url.as_str()).map_err(|e| {
        ApiError::network(chain.chain_id, format!("failed to create provider for {}: {}", chain.rpc_url, e))
    })
}
