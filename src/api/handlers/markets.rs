use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::caller::Caller;
use crate::api::ApiResponse;
use crate::errors::AppError;
use crate::market::Transition;
use crate::models::{Amount, BetDetails, EventEnvelope, MarketView, NewBet, ResolutionInfo, Side};
use crate::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ListQuery {
    pub creator: Option<String>,
}

#[derive(Deserialize)]
pub struct BetRequest {
    pub side: String,
    pub amount: Amount,
}

#[derive(Deserialize)]
pub struct VoteRequest {
    pub side: String,
}

#[derive(Deserialize)]
pub struct ProofRequest {
    pub url: String,
}

#[derive(Deserialize)]
pub struct BanRequest {
    pub address: String,
}

#[derive(Serialize)]
pub struct Created {
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct Paid {
    pub amount_usd: Amount,
    pub amount_util: Amount,
}

#[derive(Serialize)]
pub struct BanStatus {
    pub address: String,
    pub banned: bool,
}

fn parse_side(raw: &str) -> Result<Side, AppError> {
    Side::from_api_str(raw).ok_or_else(|| AppError::BadRequest(format!("invalid side: {raw}")))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// POST /api/markets: create a market; the caller becomes its creator
pub async fn create(
    State(state): State<AppState>,
    Caller(creator): Caller,
    Json(body): Json<NewBet>,
) -> Result<Json<ApiResponse<Created>>, AppError> {
    let id = state.registry.create_bet(&creator, body).await?;
    Ok(Json(ApiResponse::ok(Created { id })))
}

/// GET /api/markets: all markets in creation order, optionally by creator
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<MarketView>>>, AppError> {
    let handles = match query.creator.as_deref() {
        Some(creator) => state.registry.markets_by_creator(creator),
        None => state.registry.store().handles(),
    };

    let mut views = Vec::with_capacity(handles.len());
    for handle in handles {
        views.push(handle.view().await);
    }
    Ok(Json(ApiResponse::ok(views)))
}

/// GET /api/markets/{id}
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MarketView>>, AppError> {
    let market = state.registry.market(id)?;
    Ok(Json(ApiResponse::ok(market.view().await)))
}

/// GET /api/markets/{id}/details: immutable terms
pub async fn bet_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BetDetails>>, AppError> {
    let market = state.registry.market(id)?;
    Ok(Json(ApiResponse::ok(market.details().await)))
}

/// GET /api/markets/{id}/resolution
pub async fn resolution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ResolutionInfo>>, AppError> {
    let market = state.registry.market(id)?;
    Ok(Json(ApiResponse::ok(market.resolution_info().await)))
}

/// GET /api/markets/{id}/events: ordered event log
pub async fn events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<EventEnvelope>>>, AppError> {
    let market = state.registry.market(id)?;
    Ok(Json(ApiResponse::ok(market.events().await)))
}

// ---------------------------------------------------------------------------
// Participation
// ---------------------------------------------------------------------------

/// POST /api/markets/{id}/bets
pub async fn place_bet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Caller(user): Caller,
    Json(body): Json<BetRequest>,
) -> Result<Json<ApiResponse<MarketView>>, AppError> {
    let side = parse_side(&body.side)?;
    let market = state.registry.market(id)?;
    market.place_bet(&user, side, body.amount).await?;
    Ok(Json(ApiResponse::ok(market.view().await)))
}

/// POST /api/markets/{id}/votes
pub async fn vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Caller(voter): Caller,
    Json(body): Json<VoteRequest>,
) -> Result<Json<ApiResponse<MarketView>>, AppError> {
    let side = parse_side(&body.side)?;
    let market = state.registry.market(id)?;
    market.vote(&voter, side).await?;
    Ok(Json(ApiResponse::ok(market.view().await)))
}

/// POST /api/markets/{id}/proof
pub async fn submit_proof(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Caller(caller): Caller,
    Json(body): Json<ProofRequest>,
) -> Result<Json<ApiResponse<MarketView>>, AppError> {
    let market = state.registry.market(id)?;
    market.submit_proof(&caller, &body.url).await?;
    Ok(Json(ApiResponse::ok(market.view().await)))
}

/// POST /api/markets/{id}/bans: creator bans an address while betting is open
pub async fn ban(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Caller(caller): Caller,
    Json(body): Json<BanRequest>,
) -> Result<Json<ApiResponse<BanStatus>>, AppError> {
    let market = state.registry.market(id)?;
    market.ban(&caller, &body.address).await?;
    Ok(Json(ApiResponse::ok(BanStatus {
        address: body.address,
        banned: true,
    })))
}

/// GET /api/markets/{id}/bans/{address}
pub async fn is_banned(
    State(state): State<AppState>,
    Path((id, address)): Path<(Uuid, String)>,
) -> Result<Json<ApiResponse<BanStatus>>, AppError> {
    let market = state.registry.market(id)?;
    let banned = market.is_banned(&address).await;
    Ok(Json(ApiResponse::ok(BanStatus { address, banned })))
}

// ---------------------------------------------------------------------------
// Deadline checks (callable by anyone, no-ops before their time)
// ---------------------------------------------------------------------------

/// POST /api/markets/{id}/close-betting
pub async fn close_betting(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Transition>>, AppError> {
    let market = state.registry.market(id)?;
    Ok(Json(ApiResponse::ok(market.close_betting().await?)))
}

/// POST /api/markets/{id}/cancel-missing-proof
pub async fn cancel_missing_proof(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Transition>>, AppError> {
    let market = state.registry.market(id)?;
    Ok(Json(ApiResponse::ok(market.cancel_for_missing_proof().await?)))
}

/// POST /api/markets/{id}/resolve
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Transition>>, AppError> {
    let market = state.registry.market(id)?;
    Ok(Json(ApiResponse::ok(market.resolve().await?)))
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// POST /api/markets/{id}/claims/winnings
pub async fn claim_winnings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Caller(user): Caller,
) -> Result<Json<ApiResponse<Paid>>, AppError> {
    let market = state.registry.market(id)?;
    let amount_usd = market.claim_winnings(&user).await?;
    Ok(Json(ApiResponse::ok(Paid {
        amount_usd,
        amount_util: 0,
    })))
}

/// POST /api/markets/{id}/claims/refund
pub async fn claim_refund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Caller(user): Caller,
) -> Result<Json<ApiResponse<Paid>>, AppError> {
    let market = state.registry.market(id)?;
    let amount_usd = market.claim_refund(&user).await?;
    Ok(Json(ApiResponse::ok(Paid {
        amount_usd,
        amount_util: 0,
    })))
}

/// POST /api/markets/{id}/claims/voter-rewards
pub async fn claim_voter_rewards(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Caller(voter): Caller,
) -> Result<Json<ApiResponse<Paid>>, AppError> {
    let market = state.registry.market(id)?;
    let (amount_usd, amount_util) = market.claim_voter_rewards(&voter).await?;
    Ok(Json(ApiResponse::ok(Paid {
        amount_usd,
        amount_util,
    })))
}

/// POST /api/markets/{id}/claims/collateral
pub async fn claim_collateral(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Caller(creator): Caller,
) -> Result<Json<ApiResponse<Paid>>, AppError> {
    let market = state.registry.market(id)?;
    let amount_usd = market.claim_creator_collateral(&creator).await?;
    Ok(Json(ApiResponse::ok(Paid {
        amount_usd,
        amount_util: 0,
    })))
}
