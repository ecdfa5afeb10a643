use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes: no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes: require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Registry
        .route("/api/markets", get(handlers::markets::list).post(handlers::markets::create))
        .route("/api/markets/:id", get(handlers::markets::detail))
        .route("/api/markets/:id/details", get(handlers::markets::bet_details))
        .route("/api/markets/:id/resolution", get(handlers::markets::resolution))
        .route("/api/markets/:id/events", get(handlers::markets::events))
        // Participation
        .route("/api/markets/:id/bets", post(handlers::markets::place_bet))
        .route("/api/markets/:id/votes", post(handlers::markets::vote))
        .route("/api/markets/:id/proof", post(handlers::markets::submit_proof))
        .route("/api/markets/:id/bans", post(handlers::markets::ban))
        .route("/api/markets/:id/bans/:address", get(handlers::markets::is_banned))
        // Deadline checks
        .route("/api/markets/:id/close-betting", post(handlers::markets::close_betting))
        .route("/api/markets/:id/cancel-missing-proof", post(handlers::markets::cancel_missing_proof))
        .route("/api/markets/:id/resolve", post(handlers::markets::resolve))
        // Claims
        .route("/api/markets/:id/claims/winnings", post(handlers::markets::claim_winnings))
        .route("/api/markets/:id/claims/refund", post(handlers::markets::claim_refund))
        .route("/api/markets/:id/claims/voter-rewards", post(handlers::markets::claim_voter_rewards))
        .route("/api/markets/:id/claims/collateral", post(handlers::markets::claim_collateral))
        // Ledger
        .route("/api/balances/:user", get(handlers::balances::get))
        .route("/api/balances/deposit", post(handlers::balances::deposit))
        .route("/api/balances/withdraw", post(handlers::balances::withdraw))
        .route("/api/ledger/audit", get(handlers::balances::audit))
        // Reputation
        .route("/api/reputation/:user", get(handlers::reputation::get))
        // Keeper control
        .route("/api/control/keeper/stop", post(handlers::control::stop))
        .route("/api/control/keeper/resume", post(handlers::control::resume))
        .route("/api/control/keeper/run", post(handlers::control::run))
        .route("/api/control/keeper/status", get(handlers::control::status))
        // WebSocket
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
