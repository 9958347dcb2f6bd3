//! Send flow: a single form followed by a wait for the transfer.

use ethers::types::{Address, U256};
use serde::Serialize;

use crate::blockchain::models::TokenMetadata;
use crate::flow::state::{ActionOutcome, InvalidTransition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SendFlowState {
    ShowingForm {
        token: TokenMetadata,
    },
    AwaitingConfirmation {
        token: TokenMetadata,
        to: Address,
        amount: U256,
    },
}

impl SendFlowState {
    pub fn kind(&self) -> &'static str {
        match self {
            SendFlowState::ShowingForm { .. } => "showing-form",
            SendFlowState::AwaitingConfirmation { .. } => "awaiting-confirmation",
        }
    }

    pub fn token(&self) -> &TokenMetadata {
        match self {
            SendFlowState::ShowingForm { token } | SendFlowState::AwaitingConfirmation { token, .. } => token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFlowEvent {
    Next { to: Address, amount: U256 },
    Resolved { outcome: ActionOutcome },
}

impl SendFlowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SendFlowEvent::Next { .. } => "next",
            SendFlowEvent::Resolved { .. } => "resolved",
        }
    }
}

/// Where the send flow goes after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStep {
    Continue(SendFlowState),
    /// The flow is over and its state can be dropped.
    Complete(ActionOutcome),
}

pub fn send_transition(state: &SendFlowState, event: SendFlowEvent) -> Result<SendStep, InvalidTransition> {
    match (state, event) {
        (SendFlowState::ShowingForm { token }, SendFlowEvent::Next { to, amount }) => {
            Ok(SendStep::Continue(SendFlowState::AwaitingConfirmation {
                token: token.clone(),
                to,
                amount,
            }))
        }
        (SendFlowState::AwaitingConfirmation { .. }, SendFlowEvent::Resolved { outcome }) => Ok(SendStep::Complete(outcome)),
        (state, event) => Err(InvalidTransition {
            state: state.kind(),
            event: event.name(),
        }),
    }
}
