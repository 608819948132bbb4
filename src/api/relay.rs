//! Generic relay: forwards a request to the URL named by `X-Target-Uri`.
//!
//! The target replaces scheme, host, path and query of the inbound request.
//! Method, headers and body are passed on; status, headers and body of the
//! upstream response come back unchanged. No retries.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, header},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::error::RawError;
use super::state::AppState;
use crate::config::RelayConfig;

pub const TARGET_URI_HEADER: &str = "x-target-uri";

/// Connection-scoped headers, regenerated on each hop
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Never leaves this process
const API_TOKEN_HEADER: &str = "x-api-token";

/// Client used for relayed requests
pub fn client(config: &RelayConfig) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(&config.user_agent)
        .build()
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Headers forwarded upstream. `Host` follows the target URL.
fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name)
            || *name == header::HOST
            || *name == header::CONTENT_LENGTH
            || name.as_str() == API_TOKEN_HEADER
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Headers copied back to the client, repeated values included
fn inbound_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Any method on `/api/v1/proxy` and `/api/v1/proxy/{*rest}`
pub async fn proxy(State(state): State<AppState>, req: Request) -> Response {
    state.metrics.relay_request();

    match forward(&state.http, req, state.max_body_bytes()).await {
        Ok(response) => response,
        Err(err) => {
            state.metrics.relay_failed();
            warn!(error = %err, "Relay failed");
            err.into_response()
        }
    }
}

/// Send `req` to its `X-Target-Uri` and stream the answer back
pub async fn forward(client: &Client, req: Request, max_body: usize) -> Result<Response, RawError> {
    let (parts, body) = req.into_parts();

    let target = parts
        .headers
        .get(TARGET_URI_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RawError("param invalid: X-Target-Uri".to_string()))?;
    let target = Url::parse(target).map_err(|err| RawError(err.to_string()))?;

    let body = axum::body::to_bytes(body, max_body)
        .await
        .map_err(|err| RawError(err.to_string()))?;

    debug!(method = %parts.method, target = %target, "Relaying request");

    let upstream = client
        .request(parts.method, target)
        .headers(outbound_headers(&parts.headers))
        .body(body)
        .send()
        .await
        .map_err(|err| RawError(err.to_string()))?;

    let status = upstream.status();
    let headers = inbound_headers(upstream.headers());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;

    Ok(response)
}
