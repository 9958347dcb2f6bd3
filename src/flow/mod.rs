// src/flow/mod.rs

pub mod balances;
pub mod controller;
pub mod effects;
pub mod send;
pub mod send_controller;
pub mod state;

pub use controller::{FlowCommand, FlowController, FlowSnapshot};
pub use send_controller::{SendController, SendSnapshot, SendStatus};
pub use state::{ActionOutcome, FlowEvent, FlowState, PendingAction};
