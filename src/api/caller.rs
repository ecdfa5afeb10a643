use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::errors::AppError;
use crate::market::is_system_account;
use crate::AppState;

pub const CALLER_HEADER: &str = "x-caller";

/// Identity of the account acting on a request, taken from `x-caller`.
///
/// Wallet signatures are verified upstream; this layer trusts the header
/// but never lets it name an escrow or the treasury.
#[derive(Debug, Clone)]
pub struct Caller(pub String);

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let caller = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AppError::Unauthorized)?;

        if is_system_account(caller, &state.config.treasury_account) {
            return Err(AppError::Forbidden(format!("{caller} is a system account")));
        }
        Ok(Caller(caller.to_string()))
    }
}
