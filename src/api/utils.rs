//! Small request helpers shared by the extractors and handlers

use axum::http::HeaderValue;

use crate::api::error::ApiError;

/// Accepts `application/json` with any parameters (`; charset=utf-8`).
///
/// Look-alikes such as `application/jsonp`, `application/json-patch+json`
/// or `text/json` are rejected, as is anything that is not a media type.
pub fn ensure_json_content_type(value: &HeaderValue) -> Result<(), ApiError> {
    let raw = value
        .to_str()
        .map_err(|_| ApiError::InvalidParam("invalid Content-Type header".to_string()))?;

    let media_type: mime::Mime = raw
        .parse()
        .map_err(|_| ApiError::InvalidParam(format!("invalid Content-Type: {raw}")))?;

    if media_type.essence_str() != mime::APPLICATION_JSON.essence_str() {
        return Err(ApiError::InvalidParam(format!(
            "Content-Type must be application/json, got: {}",
            media_type.essence_str()
        )));
    }
    Ok(())
}

pub fn body_too_large(max_size: usize) -> ApiError {
    ApiError::InvalidParam(format!("request body exceeds {max_size} bytes"))
}

pub fn check_body_size(len: usize, max_size: usize) -> Result<(), ApiError> {
    if len > max_size {
        Err(body_too_large(max_size))
    } else {
        Ok(())
    }
}

/// `force` is honoured only for the literal value `true`
pub fn parse_force(value: Option<&str>) -> bool {
    value == Some("true")
}

/// Running inside a container, judged by the marker docker leaves behind
pub fn in_docker() -> bool {
    std::path::Path::new("/.dockerenv").exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(raw: &'static str) -> Result<(), ApiError> {
        ensure_json_content_type(&HeaderValue::from_static(raw))
    }

    #[test]
    fn test_json_content_types() {
        assert!(check("application/json").is_ok());
        assert!(check("application/json; charset=UTF-8").is_ok());
        assert!(check("Application/JSON").is_ok());
    }

    #[test]
    fn test_lookalike_content_types() {
        for raw in [
            "application/jsonp",
            "application/json-patch+json",
            "text/json",
            "text/plain",
            "invalid",
            "",
        ] {
            assert!(
                matches!(check(raw), Err(ApiError::InvalidParam(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_body_size_limit() {
        assert!(check_body_size(0, 100).is_ok());
        assert!(check_body_size(1000, 1000).is_ok());
        match check_body_size(1000, 999) {
            Err(ApiError::InvalidParam(msg)) => assert_eq!(msg, "request body exceeds 999 bytes"),
            other => panic!("Expected InvalidParam error, got {other:?}"),
        }
    }

    #[test]
    fn test_force_requires_literal_true() {
        assert!(parse_force(Some("true")));
        assert!(!parse_force(Some("TRUE")));
        assert!(!parse_force(Some("1")));
        assert!(!parse_force(Some("")));
        assert!(!parse_force(None));
    }
}
