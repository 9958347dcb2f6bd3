//! Runs the signed operations behind a [`PendingAction`].

use tracing::{info, warn};

use crate::blockchain::{models::StoreDeployment, tx_result::TxResult, wallet_manager::WalletSession};
use crate::error::Result;
use crate::flow::state::PendingAction;

/// Execute `action` against `store`. The wallet is held on the store's chain
/// for the whole action, approval included. A deposit approves the store
/// first and stops there unless the approval succeeded.
pub async fn run_pending_action(
    wallet: &WalletSession,
    store: StoreDeployment,
    action: &PendingAction,
) -> Result<TxResult<()>> {
    let lease = wallet.lease(store.chain_id).await?;
    let custody = lease.signer().custody(store.address);
    match action {
        PendingAction::Deposit { token, amount } => {
            let approval = custody.approve(token, *amount).await?;
            if !approval.is_success() {
                warn!("Approval of {} {} was not granted, skipping deposit", amount, token.symbol);
                return Ok(approval);
            }
            info!("Approved {} {}, depositing", amount, token.symbol);
            custody.deposit(token, *amount).await
        }
        PendingAction::Withdraw { token, amount } => custody.withdraw(token, *amount).await,
    }
}
