use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    api::{error_response, ApiResult},
    blockchain::models::TokenConfig,
    flow::SendSnapshot,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct StartSendRequest {
    pub token: TokenConfig,
}

/// The send form, as typed.
#[derive(Debug, Deserialize)]
pub struct NextSendRequest {
    pub to: String,
    pub amount: String,
}

pub async fn get_send_handler(State(state): State<AppState>) -> Json<SendSnapshot> {
    Json(state.send.snapshot())
}

pub async fn start_send_handler(State(state): State<AppState>, Json(input): Json<StartSendRequest>) -> ApiResult<SendSnapshot> {
    state.send.start(input.token).await.map(Json).map_err(error_response)
}

pub async fn next_send_handler(State(state): State<AppState>, Json(input): Json<NextSendRequest>) -> ApiResult<SendSnapshot> {
    state
        .send
        .next(&input.to, &input.amount)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn cancel_send_handler(State(state): State<AppState>) -> Json<SendSnapshot> {
    Json(state.send.cancel())
}
