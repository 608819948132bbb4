use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::result::{Envelope, RespCode};
use crate::engine::EngineError;
use crate::extension::ExtensionError;

/// Errors reported to clients inside the response envelope
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidParam(String),
    #[error("task not found")]
    TaskNotFound,
    #[error("unauthorized")]
    Unauthorized,
    /// Query string that cannot be decoded
    #[error("{0}")]
    MalformedQuery(String),
    /// Engine or extension subsystem failure, message passed through verbatim
    #[error("{0}")]
    Engine(String),
}

impl ApiError {
    /// `param invalid: <name>` for a missing or malformed parameter
    pub fn param(name: &str) -> Self {
        ApiError::InvalidParam(format!("param invalid: {name}"))
    }

    pub fn code(&self) -> RespCode {
        match self {
            ApiError::InvalidParam(_) => RespCode::INVALID_PARAM,
            ApiError::TaskNotFound => RespCode::TASK_NOT_FOUND,
            ApiError::Unauthorized => RespCode::UNAUTHORIZED,
            ApiError::MalformedQuery(_) | ApiError::Engine(_) => RespCode::ERROR,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::OK,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Envelope::<()>::error_with_code(self.to_string(), self.code());

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err.to_string())
    }
}

impl From<ExtensionError> for ApiError {
    fn from(err: ExtensionError) -> Self {
        ApiError::Engine(err.to_string())
    }
}

/// Failure answered with HTTP 500 and the message as a plain text body.
///
/// Used by the stats endpoint and the relay, whose clients read raw bodies.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RawError(pub String);

impl IntoResponse for RawError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0).into_response()
    }
}
