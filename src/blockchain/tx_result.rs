use std::future::Future;

use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// Outcome of a signed operation the user was asked to approve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "kebab-case")]
pub enum TxResult<T> {
    Success(T),
    /// The user declined the request in the wallet.
    Rejected,
}

impl<T> TxResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, TxResult::Success(_))
    }
}

/// Runs a signed operation, turning the wallet's "user rejected" error into
/// [`TxResult::Rejected`]. Every other error is returned unchanged.
pub async fn catch_tx_errors<T, F>(op: F) -> Result<TxResult<T>>
where
    F: Future<Output = Result<T>>,
{
    match op.await {
        Ok(result) => Ok(TxResult::Success(result)),
        Err(e) if e.is_user_rejection() => {
            info!("Transaction rejected in wallet");
            Ok(TxResult::Rejected)
        }
        Err(e) => Err(e),
    }
}
