use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::caller::Caller;
use crate::api::ApiResponse;
use crate::errors::AppError;
use crate::ledger::{AuditReport, Balances};
use crate::models::{Amount, Asset};
use crate::AppState;

#[derive(Deserialize)]
pub struct MovementRequest {
    pub asset: Asset,
    pub amount: Amount,
}

#[derive(Serialize)]
pub struct BalanceAfter {
    pub asset: Asset,
    pub balance: Amount,
}

#[derive(Serialize)]
pub struct AuditSummary {
    pub balanced: bool,
    pub journal_entries: usize,
    #[serde(flatten)]
    pub report: AuditReport,
}

/// GET /api/balances/{user}
pub async fn get(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Json<ApiResponse<Balances>> {
    Json(ApiResponse::ok(state.registry.get_internal_balances(&user)))
}

/// POST /api/balances/deposit: credit the caller's internal balance
pub async fn deposit(
    State(state): State<AppState>,
    Caller(user): Caller,
    Json(body): Json<MovementRequest>,
) -> Result<Json<ApiResponse<BalanceAfter>>, AppError> {
    let balance = state.registry.deposit(&user, body.asset, body.amount)?;
    Ok(Json(ApiResponse::ok(BalanceAfter {
        asset: body.asset,
        balance,
    })))
}

/// POST /api/balances/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    Caller(user): Caller,
    Json(body): Json<MovementRequest>,
) -> Result<Json<ApiResponse<BalanceAfter>>, AppError> {
    let balance = state.registry.withdraw(&user, body.asset, body.amount)?;
    Ok(Json(ApiResponse::ok(BalanceAfter {
        asset: body.asset,
        balance,
    })))
}

/// GET /api/ledger/audit: conservation check across every account
pub async fn audit(State(state): State<AppState>) -> Json<ApiResponse<AuditSummary>> {
    let ledger = state.registry.ledger();
    let report = ledger.audit();
    Json(ApiResponse::ok(AuditSummary {
        balanced: report.is_balanced(),
        journal_entries: ledger.journal_len(),
        report,
    }))
}
