//! Drives the deposit/withdraw flow: applies events, runs entry effects and
//! feeds asynchronous results back in.

use std::sync::Arc;

use ethers::{
    providers::{Http, JsonRpcClient},
    utils::to_checksum,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    blockchain::{
        models::{StoreDeployment, StoreTokenBalance, TokenConfig},
        provider_api::ProviderApi,
        wallet_manager::WalletSession,
    },
    error::{ApiError, Result},
    fields::{withdrawal_submittable, EthAddressField, FieldFns, TokenAmountField},
    flow::{
        balances::{BalanceBoard, HomeBalances},
        effects::run_pending_action,
        state::{transition, ActionOutcome, FlowEvent, FlowState, InvalidTransition, PendingAction},
    },
};

/// The flow state together with the number of transitions that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowSnapshot {
    pub epoch: u64,
    pub state: FlowState,
}

/// User input to the flow.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum FlowCommand {
    DepositNew,
    /// Deposit more of a token already held by the store.
    Deposit { token: String },
    Withdrawal { token: String },
    Cancel,
    /// Address typed on the new-token form.
    SubmitToken { address: String },
    /// Amount typed on the deposit or withdrawal form.
    SubmitAmount { amount: String },
    Acknowledge,
}

pub struct FlowController<P: JsonRpcClient = Http> {
    providers: Arc<ProviderApi<P>>,
    wallet: Arc<WalletSession>,
    store: StoreDeployment,
    state: watch::Sender<FlowSnapshot>,
    balances: BalanceBoard,
}

impl<P: JsonRpcClient + 'static> FlowController<P> {
    pub fn new(providers: Arc<ProviderApi<P>>, wallet: Arc<WalletSession>, store: StoreDeployment) -> Self {
        let (state, _) = watch::channel(FlowSnapshot {
            epoch: 0,
            state: FlowState::Home,
        });
        Self {
            providers,
            wallet,
            store,
            state,
            balances: BalanceBoard::new(),
        }
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.state.subscribe()
    }

    pub fn balances(&self) -> &BalanceBoard {
        &self.balances
    }

    pub fn store(&self) -> StoreDeployment {
        self.store
    }

    /// Handle one user command and return the resulting snapshot.
    ///
    /// Commands that wait on the network before transitioning only take
    /// effect if nothing else moved the flow in the meantime; otherwise the
    /// late result is dropped and the current snapshot is returned.
    pub async fn dispatch(self: &Arc<Self>, command: FlowCommand) -> Result<FlowSnapshot> {
        debug!("Flow command: {:?}", command);
        let applied = match command {
            FlowCommand::DepositNew => self.apply(None, FlowEvent::DepositNew)?,
            FlowCommand::Cancel => self.apply(None, FlowEvent::Cancel)?,
            FlowCommand::Acknowledge => self.apply(None, FlowEvent::Acknowledge)?,
            FlowCommand::Deposit { token } => {
                let epoch = self.expect_kind("home", "deposit")?;
                let token = self.providers.get_token_metadata(&self.store_token(&token)?).await?;
                self.apply(Some(epoch), FlowEvent::Deposit { token })?
            }
            FlowCommand::Withdrawal { token } => {
                let epoch = self.expect_kind("home", "withdrawal")?;
                let config = self.store_token(&token)?;
                let StoreTokenBalance { token, balance } = self
                    .balances
                    .find(&config)
                    .ok_or_else(|| ApiError::InvalidInput(format!("the store holds no {} for this account", config.address)))?;
                self.apply(Some(epoch), FlowEvent::Withdrawal { token, balance })?
            }
            FlowCommand::SubmitToken { address } => {
                let epoch = self.expect_kind("deposit-new-form", "select-token")?;
                if let Some(message) = EthAddressField.validate(&address) {
                    return Err(ApiError::InvalidInput(message));
                }
                let token = self.providers.get_token_metadata(&self.store_token(&address)?).await?;
                self.apply(Some(epoch), FlowEvent::SelectToken { token })?
            }
            FlowCommand::SubmitAmount { amount } => {
                let snapshot = self.snapshot();
                let (action, message) = prepare_submit(&snapshot.state, &amount)?;
                // The signer must be on the store's chain before anything is signed.
                self.wallet.connect(Some(self.store.chain_id)).await?;
                self.apply(Some(snapshot.epoch), FlowEvent::Submit { action, message })?
            }
        };

        match applied {
            Some(snapshot) => Ok(snapshot),
            None => {
                info!("Flow moved on while the command was in progress, dropping its result");
                Ok(self.snapshot())
            }
        }
    }

    /// Reload the store balances shown on the home screen.
    pub async fn refresh_balances(&self) -> HomeBalances {
        let ticket = self.balances.begin();
        let result = match self.load_store_balances().await {
            Ok(balances) => HomeBalances::Loaded { balances },
            Err(e) => {
                warn!("Failed to load store balances: {}", e);
                HomeBalances::Failed { message: e.to_string() }
            }
        };
        self.balances.publish(ticket, result);
        self.balances.current()
    }

    async fn load_store_balances(&self) -> Result<Vec<StoreTokenBalance>> {
        let connection = self
            .wallet
            .current()
            .await
            .ok_or(ApiError::NotConnected(self.store.chain_id))?;
        self.providers
            .get_store_balances(self.store.chain_id, self.store.address, connection.address())
            .await
    }

    fn store_token(&self, address: &str) -> Result<TokenConfig> {
        let address = EthAddressField.parse(address)?;
        Ok(TokenConfig::new(to_checksum(&address, None), self.store.chain_id))
    }

    fn expect_kind(&self, kind: &'static str, event: &'static str) -> Result<u64> {
        let snapshot = self.state.borrow();
        if snapshot.state.kind() != kind {
            return Err(InvalidTransition {
                state: snapshot.state.kind(),
                event,
            }
            .into());
        }
        Ok(snapshot.epoch)
    }

    /// Apply `event`, provided the epoch still equals `expected_epoch` (when
    /// given). Returns `None` when the flow has moved on.
    fn apply(self: &Arc<Self>, expected_epoch: Option<u64>, event: FlowEvent) -> Result<Option<FlowSnapshot>> {
        let event_name = event.name();
        let mut outcome = Ok(None);
        self.state.send_if_modified(|snapshot| {
            if expected_epoch.is_some_and(|epoch| epoch != snapshot.epoch) {
                return false;
            }
            match transition(&snapshot.state, event) {
                Ok(next) => {
                    snapshot.state = next;
                    snapshot.epoch += 1;
                    outcome = Ok(Some(snapshot.clone()));
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });

        let entered = outcome?;
        if let Some(snapshot) = &entered {
            info!("Flow {} -> {} (epoch {})", event_name, snapshot.state.kind(), snapshot.epoch);
            self.on_enter(snapshot);
        }
        Ok(entered)
    }

    fn on_enter(self: &Arc<Self>, snapshot: &FlowSnapshot) {
        match &snapshot.state {
            FlowState::Home => {
                let this = self.clone();
                tokio::spawn(async move {
                    this.refresh_balances().await;
                });
            }
            FlowState::AwaitingConfirmation { action, .. } => {
                let this = self.clone();
                let action = action.clone();
                let epoch = snapshot.epoch;
                tokio::spawn(async move {
                    let outcome = this.execute(&action).await;
                    match this.apply(Some(epoch), FlowEvent::Resolved { outcome }) {
                        Ok(Some(_)) => {}
                        Ok(None) => warn!("Dropping outcome of {:?}, flow has moved on", action),
                        Err(e) => error!("Could not resolve pending action: {}", e),
                    }
                });
            }
            _ => {}
        }
    }

    async fn execute(&self, action: &PendingAction) -> ActionOutcome {
        ActionOutcome::from_tx(run_pending_action(&self.wallet, self.store, action).await)
    }
}

/// Turn the amount typed on the current form into the action to submit.
fn prepare_submit(state: &FlowState, amount: &str) -> Result<(PendingAction, String)> {
    match state {
        FlowState::DepositForm { token } => {
            let field = TokenAmountField::new(token.decimals);
            let amount = field.from_text(amount)?;
            let message = format!("Depositing {} {} into the store", field.to_text(&amount), token.symbol);
            Ok((
                PendingAction::Deposit {
                    token: token.clone(),
                    amount,
                },
                message,
            ))
        }
        FlowState::WithdrawalForm { token, balance } => {
            let field = TokenAmountField::new(token.decimals);
            if !withdrawal_submittable(amount, token.decimals, *balance) {
                return Err(ApiError::InvalidInput(format!(
                    "amount must be a number no greater than {}",
                    field.to_text(balance)
                )));
            }
            let amount = field.from_text(amount)?;
            let message = format!("Withdrawing {} {} from the store", field.to_text(&amount), token.symbol);
            Ok((
                PendingAction::Withdraw {
                    token: token.clone(),
                    amount,
                },
                message,
            ))
        }
        other => Err(InvalidTransition {
            state: other.kind(),
            event: "submit",
        }
        .into()),
    }
}
