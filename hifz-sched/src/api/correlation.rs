//! Request correlation middleware
//!
//! Every request gets a UUID echoed in the `x-correlation-id` response
//! header. Error responses carry JSON bodies shaped `{"error": {...}}`;
//! those are buffered and the correlation id is injected into the error
//! object so clients and logs can be matched up.

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{HeaderValue, CONTENT_LENGTH};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;
use tracing::warn;

use hifz_common::uuid_utils;

/// Response header carrying the correlation id
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Error bodies are small; cap the buffer far above anything we emit
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

pub async fn correlation_middleware(request: Request, next: Next) -> Response {
    let correlation_id = uuid_utils::generate();

    let mut response = next.run(request).await;

    if response.status().is_client_error() || response.status().is_server_error() {
        response = embed_in_error_body(response, &correlation_id.to_string()).await;
        warn!(
            correlation_id = %correlation_id,
            status = %response.status(),
            "request failed"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }

    response
}

/// Rewrite `{"error": {...}}` bodies to include the correlation id
async fn embed_in_error_body(response: Response, correlation_id: &str) -> Response {
    let (mut parts, body) = response.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    let rewritten = match serde_json::from_slice::<Value>(&bytes) {
        Ok(mut value) => {
            if let Some(error) = value.get_mut("error").and_then(Value::as_object_mut) {
                error.insert(
                    "correlation_id".to_string(),
                    Value::String(correlation_id.to_string()),
                );
                serde_json::to_vec(&value).unwrap_or_else(|_| bytes.to_vec())
            } else {
                bytes.to_vec()
            }
        }
        Err(_) => bytes.to_vec(),
    };

    // Body length changed; let the server recompute it
    parts.headers.remove(CONTENT_LENGTH);

    Response::from_parts(parts, Body::from(rewritten))
}
