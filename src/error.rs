//! Error taxonomy shared by the provider, wallet, signer and flow layers.

use ethers::types::H256;
use thiserror::Error;

use crate::blockchain::models::ChainId;
use crate::flow::state::InvalidTransition;
use crate::wallet::eip1193::WalletError;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The chain id has no entry in the chain registry.
    #[error("no configuration for chain id {0}")]
    UnknownChain(ChainId),

    #[error("no wallet extension available")]
    NoWalletExtension,

    #[error("wallet connection was rejected by the user")]
    UserRejectedConnection,

    #[error("failed to switch wallet to chain {chain_id}: {reason}")]
    ChainSwitchFailed { chain_id: ChainId, reason: String },

    /// A signer was asked to act on a token that lives on another chain.
    #[error("signer is connected to chain {signer} but token lives on chain {token}")]
    ChainMismatch { signer: ChainId, token: ChainId },

    #[error("network error on chain {chain_id}: {reason}")]
    Network { chain_id: ChainId, reason: String },

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("transaction {0:?} reverted")]
    Reverted(H256),

    #[error("timed out waiting for transaction {0:?} to be mined")]
    ConfirmationTimeout(H256),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("wallet is not connected to chain {0}")]
    NotConnected(ChainId),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl ApiError {
    pub fn network(chain_id: ChainId, err: impl std::fmt::Display) -> Self {
        ApiError::Network {
            chain_id,
            reason: err.to_string(),
        }
    }

    /// True when the wallet reported that the user declined the request.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ApiError::Wallet(e) if e.is_user_rejection())
    }
}
