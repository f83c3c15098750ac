//! Middleware for logging requests and responses.

use axum::{
    extract::Request,
    http::{HeaderValue, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};

/// The JSON fields whose values are hidden in the logs.
const SECRET_FIELDS: [&str; 3] = ["access_code", "admin_code", "code"];

/// How many bytes of a body are logged at the `info` level before the rest is
/// deferred to the `debug` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// Credential fields in JSON bodies are replaced with asterisks before
/// logging, on both the request and the response side (responses carry the
/// stored admin code, e.g. from the settings routes). If a body is longer
/// than [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated and the full body is
/// logged at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body_text) = extract_parts_and_body_text_from_request(request).await;

    log_request(&parts, &loggable_body(parts.headers.get(CONTENT_TYPE), &body_text));

    let request = Request::from_parts(parts, body_text.into());
    let response = next.run(request).await;

    let (parts, body_text) = extract_parts_and_body_text_from_response(response).await;

    log_response(&parts, &loggable_body(parts.headers.get(CONTENT_TYPE), &body_text));

    Response::from_parts(parts, body_text.into())
}

/// The text that may be written to the logs for a body with the given
/// content type. JSON bodies get their secret fields redacted first.
fn loggable_body(content_type: Option<&HeaderValue>, body_text: &str) -> String {
    if is_json(content_type) {
        redact_secret_fields(body_text)
    } else {
        body_text.to_string()
    }
}

// Matches on the media type only, so parameters like "; charset=utf-8" do
// not bypass redaction.
fn is_json(content_type: Option<&HeaderValue>) -> bool {
    content_type
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

fn redact_secret_fields(body_text: &str) -> String {
    let Ok(mut body) = serde_json::from_str::<serde_json::Value>(body_text) else {
        return body_text.to_string();
    };

    if let Some(object) = body.as_object_mut() {
        for field_name in SECRET_FIELDS {
            if let Some(value) = object.get_mut(field_name) {
                *value = serde_json::Value::String("********".to_string());
            }
        }
    }

    body.to_string()
}

async fn extract_parts_and_body_text_from_request(
    request: Request,
) -> (axum::http::request::Parts, String) {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    (parts, String::from_utf8_lossy(&body_bytes).to_string())
}

async fn extract_parts_and_body_text_from_response(
    response: Response,
) -> (axum::http::response::Parts, String) {
    let (parts, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    (parts, String::from_utf8_lossy(&body_bytes).to_string())
}

// Truncate on a character count rather than a byte index so that multi-byte
// text cannot split a character.
fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LENGTH_LIMIT).collect()
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Received request: {parts:#?}\nbody: {:}...", truncate(body));
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {parts:#?}\nbody: {body:?}");
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Sending response: {parts:#?}\nbody: {:}...", truncate(body));
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {parts:#?}\nbody: {body:?}");
    }
}
