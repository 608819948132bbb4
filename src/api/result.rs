//! Uniform response envelope
//!
//! Every JSON response has the shape `{code, msg, data, hash}`. `hash` is
//! the hex SHA-256 of the canonical JSON of `data`, so polling clients can
//! tell unchanged state apart without diffing payloads.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Response code carried in the envelope. Open ended, new codes are plain consts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RespCode(pub i32);

impl RespCode {
    pub const OK: RespCode = RespCode(0);
    pub const ERROR: RespCode = RespCode(1000);
    pub const UNAUTHORIZED: RespCode = RespCode(1001);
    pub const INVALID_PARAM: RespCode = RespCode(1002);
    pub const TASK_NOT_FOUND: RespCode = RespCode(2001);
}

#[derive(Debug, Clone)]
pub enum Envelope<T> {
    Success { data: T, hash: String },
    Failure { code: RespCode, msg: String },
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        let hash = digest(&data);
        Envelope::Success { data, hash }
    }
}

impl Envelope<()> {
    /// Acknowledgement without payload. Always carries the same hash.
    pub fn nil() -> Self {
        Envelope::ok(())
    }
}

impl<T> Envelope<T> {
    pub fn error(msg: impl Into<String>) -> Self {
        Self::error_with_code(msg, RespCode::ERROR)
    }

    pub fn error_with_code(msg: impl Into<String>, code: RespCode) -> Self {
        Envelope::Failure {
            code,
            msg: msg.into(),
        }
    }

    pub fn code(&self) -> RespCode {
        match self {
            Envelope::Success { .. } => RespCode::OK,
            Envelope::Failure { code, .. } => *code,
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            Envelope::Success { hash, .. } => hash,
            Envelope::Failure { .. } => "",
        }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Envelope", 4)?;
        match self {
            Envelope::Success { data, hash } => {
                state.serialize_field("code", &RespCode::OK)?;
                state.serialize_field("msg", "")?;
                state.serialize_field("data", data)?;
                state.serialize_field("hash", hash)?;
            }
            Envelope::Failure { code, msg } => {
                state.serialize_field("code", code)?;
                state.serialize_field("msg", msg)?;
                state.serialize_field("data", &Value::Null)?;
                state.serialize_field("hash", "")?;
            }
        }
        state.end()
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Lowercase hex SHA-256 of the canonical JSON form of `data`.
///
/// Object keys are sorted at every depth. Returns an empty string when
/// `data` cannot be serialized.
pub fn digest<T: Serialize + ?Sized>(data: &T) -> String {
    let Ok(value) = serde_json::to_value(data) else {
        return String::new();
    };
    let Ok(bytes) = serde_json::to_vec(&canonicalize(value)) else {
        return String::new();
    };
    hex::encode(Sha256::digest(&bytes))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
