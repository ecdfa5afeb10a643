use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::ApiResponse;
use crate::keeper::CycleReport;
use crate::AppState;

/// POST /api/control/keeper/stop: Pause the periodic keeper.
pub async fn stop(State(state): State<AppState>) -> impl IntoResponse {
    state.pause_flag.store(true, Ordering::Relaxed);
    tracing::warn!("Keeper PAUSED via control API");
    (StatusCode::OK, Json(json!({ "status": "paused" })))
}

/// POST /api/control/keeper/resume: Resume the periodic keeper.
pub async fn resume(State(state): State<AppState>) -> impl IntoResponse {
    state.pause_flag.store(false, Ordering::Relaxed);
    tracing::info!("Keeper RESUMED via control API");
    (StatusCode::OK, Json(json!({ "status": "running" })))
}

/// POST /api/control/keeper/run: Run one keeper cycle now, even while paused.
pub async fn run(State(state): State<AppState>) -> Json<ApiResponse<CycleReport>> {
    let report = state.keeper.run_cycle().await;
    tracing::info!(
        scanned = report.scanned,
        advanced = report.advanced,
        "Keeper cycle triggered via control API"
    );
    Json(ApiResponse::ok(report))
}

/// GET /api/control/keeper/status: Keeper state and the last cycle's report.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let paused = state.pause_flag.load(Ordering::Relaxed);
    let keeper = state.keeper.config();

    Json(json!({
        "paused": paused,
        "keeper_enabled": state.config.keeper_enabled,
        "interval_secs": keeper.interval.as_secs(),
        "concurrency": keeper.concurrency,
        "markets": state.registry.store().len(),
        "last_cycle": state.keeper.last_report(),
    }))
}
