//! Boundary to the user's wallet.
//!
//! The dapp never holds keys: every account, chain and signing request is
//! forwarded to an EIP-1193 provider. [`HttpWallet`] reaches a wallet that
//! exposes its provider as a JSON-RPC endpoint (for example Frame's local
//! `http://127.0.0.1:1248`); tests substitute their own implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::protocol::{error_codes, ErrorObject, Request, Response};

#[derive(Debug, Clone, Error)]
pub enum WalletError {
    /// The wallet answered with an error object.
    #[error("wallet error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The wallet could not be reached or answered with garbage.
    #[error("wallet transport error: {0}")]
    Transport(String),
}

impl WalletError {
    pub fn code(&self) -> Option<i64> {
        match self {
            WalletError::Rpc { code, .. } => Some(*code),
            WalletError::Transport(_) => None,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code() == Some(error_codes::USER_REJECTED_REQUEST)
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code() == Some(error_codes::UNRECOGNIZED_CHAIN)
    }
}

impl From<ErrorObject> for WalletError {
    fn from(e: ErrorObject) -> Self {
        WalletError::Rpc {
            code: e.code,
            message: e.message,
        }
    }
}

/// An EIP-1193 `request({ method, params })` surface.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;
}

/// Wallet reached over HTTP JSON-RPC.
pub struct HttpWallet {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpWallet {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl Eip1193Provider for HttpWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = Request::new(id, method, params);
        debug!("wallet request #{}: {}", id, method);

        let response: Response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;

        response.into_result().map_err(WalletError::from)
    }
}
