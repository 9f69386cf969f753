//! Bearer-token auth middleware. On failure it aborts with 401 before the
//! handler runs; on success it does not stash the user id anywhere —
//! handlers that need it re-parse the token themselves.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use common::KeeperError;

use crate::AppState;

pub async fn require_bearer_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    if !state.token_issuer.verify(token) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Re-parse the bearer token out of the request headers and extract
/// `user_id`. Used by handlers after the auth middleware has already
/// verified the signature.
pub fn user_id_from_headers(state: &AppState, headers: &HeaderMap) -> Result<i64, KeeperError> {
    let token = bearer_token(headers).ok_or(KeeperError::AuthFailed)?;
    let claims = state
        .token_issuer
        .get_params(token)
        .map_err(|_| KeeperError::AuthFailed)?;
    claims
        .get("user_id")
        .ok_or(KeeperError::AuthFailed)?
        .parse()
        .map_err(|_| KeeperError::AuthFailed)
}
