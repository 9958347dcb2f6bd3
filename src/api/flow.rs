use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    api::{error_response, ApiResult},
    flow::{balances::HomeBalances, FlowCommand, FlowSnapshot},
    AppState,
};

/// The flow as the client renders it.
#[derive(Debug, Serialize)]
pub struct FlowView {
    #[serde(flatten)]
    pub snapshot: FlowSnapshot,
    pub balances: HomeBalances,
}

fn view(state: &AppState, snapshot: FlowSnapshot) -> FlowView {
    FlowView {
        snapshot,
        balances: state.flow.balances().current(),
    }
}

pub async fn get_flow_handler(State(state): State<AppState>) -> Json<FlowView> {
    let snapshot = state.flow.snapshot();
    Json(view(&state, snapshot))
}

pub async fn flow_command_handler(State(state): State<AppState>, Json(command): Json<FlowCommand>) -> ApiResult<FlowView> {
    let snapshot = state.flow.dispatch(command).await.map_err(error_response)?;
    Ok(Json(view(&state, snapshot)))
}

pub async fn refresh_balances_handler(State(state): State<AppState>) -> Json<HomeBalances> {
    Json(state.flow.refresh_balances().await)
}
