//! Deposit/withdraw flow: plain-data states and a pure transition function.

use ethers::types::U256;
use serde::Serialize;
use thiserror::Error;

use crate::blockchain::models::TokenMetadata;
use crate::blockchain::tx_result::TxResult;
use crate::error::{ApiError, Result};

/// Shown when the user declines a transaction in the wallet.
pub const REJECTED_MESSAGE: &str = "Transaction rejected";

/// A signed operation waiting on the user and the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PendingAction {
    /// `approve` followed by `deposit`.
    Deposit { token: TokenMetadata, amount: U256 },
    Withdraw { token: TokenMetadata, amount: U256 },
}

impl PendingAction {
    pub fn token(&self) -> &TokenMetadata {
        match self {
            PendingAction::Deposit { token, .. } | PendingAction::Withdraw { token, .. } => token,
        }
    }

    pub fn amount(&self) -> U256 {
        match self {
            PendingAction::Deposit { amount, .. } | PendingAction::Withdraw { amount, .. } => *amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ActionOutcome {
    Success,
    Rejected,
    Failed { reason: String },
}

impl ActionOutcome {
    /// Collapse the result of running a pending action into an outcome.
    pub fn from_tx(result: Result<TxResult<()>>) -> Self {
        match result {
            Ok(TxResult::Success(())) => ActionOutcome::Success,
            Ok(TxResult::Rejected) => ActionOutcome::Rejected,
            Err(e) => ActionOutcome::Failed { reason: e.to_string() },
        }
    }

    pub fn from_error(err: &ApiError) -> Self {
        ActionOutcome::Failed { reason: err.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FlowState {
    Home,
    DepositNewForm,
    DepositForm {
        token: TokenMetadata,
    },
    WithdrawalForm {
        token: TokenMetadata,
        /// Store balance when the form was opened. Not refreshed.
        balance: U256,
    },
    AwaitingConfirmation {
        action: PendingAction,
        message: String,
    },
    ErrorMessage {
        message: String,
    },
}

impl Default for FlowState {
    fn default() -> Self {
        FlowState::Home
    }
}

impl FlowState {
    pub fn kind(&self) -> &'static str {
        match self {
            FlowState::Home => "home",
            FlowState::DepositNewForm => "deposit-new-form",
            FlowState::DepositForm { .. } => "deposit-form",
            FlowState::WithdrawalForm { .. } => "withdrawal-form",
            FlowState::AwaitingConfirmation { .. } => "awaiting-confirmation",
            FlowState::ErrorMessage { .. } => "error-message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    DepositNew,
    Deposit { token: TokenMetadata },
    Withdrawal { token: TokenMetadata, balance: U256 },
    Cancel,
    /// Metadata for the address entered on the new-token form was resolved.
    SelectToken { token: TokenMetadata },
    Submit { action: PendingAction, message: String },
    Resolved { outcome: ActionOutcome },
    Acknowledge,
}

impl FlowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FlowEvent::DepositNew => "deposit-new",
            FlowEvent::Deposit { .. } => "deposit",
            FlowEvent::Withdrawal { .. } => "withdrawal",
            FlowEvent::Cancel => "cancel",
            FlowEvent::SelectToken { .. } => "select-token",
            FlowEvent::Submit { .. } => "submit",
            FlowEvent::Resolved { .. } => "resolved",
            FlowEvent::Acknowledge => "acknowledge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event '{event}' is not valid in state '{state}'")]
pub struct InvalidTransition {
    pub state: &'static str,
    pub event: &'static str,
}

/// Compute the state that follows `state` on `event`.
///
/// Pairs that are not in the flow table are refused and leave the caller's
/// state untouched.
pub fn transition(state: &FlowState, event: FlowEvent) -> std::result::Result<FlowState, InvalidTransition> {
    let invalid = InvalidTransition {
        state: state.kind(),
        event: event.name(),
    };

    let next = match (state, event) {
        (FlowState::Home, FlowEvent::DepositNew) => FlowState::DepositNewForm,
        (FlowState::Home, FlowEvent::Deposit { token }) => FlowState::DepositForm { token },
        (FlowState::Home, FlowEvent::Withdrawal { token, balance }) => FlowState::WithdrawalForm { token, balance },

        (FlowState::DepositNewForm, FlowEvent::Cancel) => FlowState::Home,
        (FlowState::DepositNewForm, FlowEvent::SelectToken { token }) => FlowState::DepositForm { token },

        (FlowState::DepositForm { .. }, FlowEvent::Cancel) => FlowState::Home,
        (FlowState::DepositForm { token }, FlowEvent::Submit { action, message }) => {
            let accepted = matches!(&action, PendingAction::Deposit { token: t, .. } if t.config == token.config);
            if !accepted {
                return Err(invalid);
            }
            FlowState::AwaitingConfirmation { action, message }
        }

        (FlowState::WithdrawalForm { .. }, FlowEvent::Cancel) => FlowState::Home,
        (FlowState::WithdrawalForm { token, balance }, FlowEvent::Submit { action, message }) => {
            let accepted = matches!(
                &action,
                PendingAction::Withdraw { token: t, amount } if t.config == token.config && amount <= balance
            );
            if !accepted {
                return Err(invalid);
            }
            FlowState::AwaitingConfirmation { action, message }
        }

        (FlowState::AwaitingConfirmation { .. }, FlowEvent::Resolved { outcome }) => match outcome {
            ActionOutcome::Success => FlowState::Home,
            ActionOutcome::Rejected => FlowState::ErrorMessage {
                message: REJECTED_MESSAGE.to_string(),
            },
            ActionOutcome::Failed { reason } => FlowState::ErrorMessage { message: reason },
        },

        (FlowState::ErrorMessage { .. }, FlowEvent::Acknowledge) => FlowState::Home,

        _ => return Err(invalid),
    };
    Ok(next)
}
