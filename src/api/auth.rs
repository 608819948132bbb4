use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::error::ApiError;
use super::state::AppState;

pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Token check for `/api/v1`.
///
/// Without a configured token every request passes. Otherwise `X-Api-Token`
/// must match exactly (compared in constant time), or the request is answered with 401 and an
/// `Unauthorized` envelope.
pub async fn require_token(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.config.server.api_token.as_deref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(API_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided.is_some_and(|provided| token_matches(provided, expected)) {
        next.run(req).await
    } else {
        warn!(path = %req.uri().path(), "Rejected request without a valid API token");
        ApiError::Unauthorized.into_response()
    }
}

/// Compares fixed-size digests so the time taken does not depend on where
/// the tokens first differ or on their lengths.
fn token_matches(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
