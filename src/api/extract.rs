//! Request extractors that reject with envelope errors

use axum::{
    body::Body,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::query::TaskQuery;
use super::state::AppState;
use super::utils::{body_too_large, check_body_size, ensure_json_content_type};

/// JSON request body.
///
/// A missing `Content-Type` is tolerated; anything else must be
/// `application/json`. Oversized or unparsable bodies become `InvalidParam`.
/// Compressed bodies were already inflated by the decompression layer.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<T> FromRequest<AppState> for ApiJson<T>
where
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(value) = req.headers().get(header::CONTENT_TYPE) {
            ensure_json_content_type(value)?;
        }

        let data = read_body(req.into_body(), state.max_body_bytes()).await?;
        let value = serde_json::from_slice(&data)
            .map_err(|err| ApiError::InvalidParam(err.to_string()))?;

        Ok(ApiJson(value))
    }
}

async fn read_body(body: Body, max_size: usize) -> Result<bytes::Bytes, ApiError> {
    // One byte of headroom so an oversized body is reported by size, not by a read error
    let data = axum::body::to_bytes(body, max_size.saturating_add(1))
        .await
        .map_err(|_| body_too_large(max_size))?;

    check_body_size(data.len(), max_size)?;

    Ok(data)
}

/// Filter and pagination parameters from the raw query string
impl<S> FromRequestParts<S> for TaskQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        TaskQuery::parse(parts.uri.query())
    }
}
