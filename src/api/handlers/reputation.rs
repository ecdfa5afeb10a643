use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::ApiResponse;
use crate::AppState;

#[derive(Serialize)]
pub struct Score {
    pub user: String,
    pub score: u32,
}

/// GET /api/reputation/{user}
pub async fn get(State(state): State<AppState>, Path(user): Path<String>) -> Json<ApiResponse<Score>> {
    let score = state.registry.reputation().score(&user);
    Json(ApiResponse::ok(Score { user, score }))
}
