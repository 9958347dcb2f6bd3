//! Hosts the send flow: connects the wallet to the token's chain, collects
//! the destination and amount, then waits for the transfer.

use std::sync::Arc;

use ethers::providers::{Http, JsonRpcClient};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    blockchain::{models::TokenConfig, provider_api::ProviderApi, wallet_manager::WalletSession},
    error::{ApiError, Result},
    fields::{EthAddressField, FieldFns, TokenAmountField},
    flow::{
        send::{send_transition, SendFlowEvent, SendFlowState, SendStep},
        state::{ActionOutcome, InvalidTransition},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SendStatus {
    Idle,
    Active { flow: SendFlowState },
    /// The last flow finished. Its state has been dropped.
    Completed { outcome: ActionOutcome },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendSnapshot {
    pub epoch: u64,
    #[serde(flatten)]
    pub status: SendStatus,
}

pub struct SendController<P: JsonRpcClient = Http> {
    providers: Arc<ProviderApi<P>>,
    wallet: Arc<WalletSession>,
    status: watch::Sender<SendSnapshot>,
}

impl<P: JsonRpcClient + 'static> SendController<P> {
    pub fn new(providers: Arc<ProviderApi<P>>, wallet: Arc<WalletSession>) -> Self {
        let (status, _) = watch::channel(SendSnapshot {
            epoch: 0,
            status: SendStatus::Idle,
        });
        Self {
            providers,
            wallet,
            status,
        }
    }

    pub fn snapshot(&self) -> SendSnapshot {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SendSnapshot> {
        self.status.subscribe()
    }

    /// Begin sending `token`. The wallet is moved to the token's chain before
    /// the form is shown.
    pub async fn start(&self, token: TokenConfig) -> Result<SendSnapshot> {
        let epoch = self.snapshot().epoch;
        let token = self.providers.get_token_metadata(&token).await?;
        self.wallet.connect(Some(token.chain_id())).await?;
        info!("Sending {} on chain {}", token.symbol, token.chain_id());

        self.publish(Some(epoch), SendStatus::Active {
            flow: SendFlowState::ShowingForm { token },
        })
        .ok_or_else(|| ApiError::InvalidInput("another send was started meanwhile".to_string()))
    }

    /// Submit the form. The transfer runs in the background; completion is
    /// published on the status channel.
    pub async fn next(self: &Arc<Self>, to: &str, amount: &str) -> Result<SendSnapshot> {
        let SendSnapshot { epoch, status } = self.snapshot();
        let SendStatus::Active { flow } = status else {
            return Err(InvalidTransition {
                state: "idle",
                event: "next",
            }
            .into());
        };

        if let Some(message) = EthAddressField.validate(to) {
            return Err(ApiError::InvalidInput(message));
        }
        let to = EthAddressField.parse(to)?;
        let amount = TokenAmountField::new(flow.token().decimals).from_text(amount)?;

        let step = send_transition(&flow, SendFlowEvent::Next { to, amount })?;
        let SendStep::Continue(awaiting) = step else {
            return Err(InvalidTransition {
                state: flow.kind(),
                event: "next",
            }
            .into());
        };

        // Another flow may have moved the wallet since the form was shown.
        self.wallet.connect(Some(flow.token().chain_id())).await?;

        let snapshot = self
            .publish(Some(epoch), SendStatus::Active { flow: awaiting.clone() })
            .ok_or_else(|| ApiError::InvalidInput("send flow changed while submitting".to_string()))?;

        let this = self.clone();
        let epoch = snapshot.epoch;
        tokio::spawn(async move {
            let outcome = this.execute(&awaiting).await;
            this.resolve(epoch, &awaiting, outcome);
        });
        Ok(snapshot)
    }

    /// Abandon the current flow. A transfer already submitted keeps running
    /// but its outcome is dropped.
    pub fn cancel(&self) -> SendSnapshot {
        self.status.send_modify(|snapshot| {
            snapshot.epoch += 1;
            snapshot.status = SendStatus::Idle;
        });
        self.snapshot()
    }

    async fn execute(&self, flow: &SendFlowState) -> ActionOutcome {
        let SendFlowState::AwaitingConfirmation { token, to, amount } = flow else {
            return ActionOutcome::Failed {
                reason: "nothing to send".to_string(),
            };
        };
        let lease = match self.wallet.lease(token.chain_id()).await {
            Ok(lease) => lease,
            Err(e) => return ActionOutcome::from_error(&e),
        };
        ActionOutcome::from_tx(lease.signer().transfer(token, *to, *amount).await)
    }

    fn resolve(&self, epoch: u64, flow: &SendFlowState, outcome: ActionOutcome) {
        match send_transition(flow, SendFlowEvent::Resolved { outcome }) {
            Ok(SendStep::Complete(outcome)) => {
                info!("Send flow finished: {:?}", outcome);
                if self.publish(Some(epoch), SendStatus::Completed { outcome }).is_none() {
                    warn!("Dropping send outcome, flow was cancelled or replaced");
                }
            }
            Ok(SendStep::Continue(_)) => {}
            Err(e) => warn!("Could not resolve send flow: {}", e),
        }
    }

    fn publish(&self, expected_epoch: Option<u64>, status: SendStatus) -> Option<SendSnapshot> {
        let mut published = None;
        self.status.send_if_modified(|snapshot| {
            if expected_epoch.is_some_and(|epoch| epoch != snapshot.epoch) {
                return false;
            }
            snapshot.epoch += 1;
            snapshot.status = status;
            published = Some(snapshot.clone());
            true
        });
        published
    }
}
