//! Request correlation.
//!
//! Each request gets an id: the caller's `x-request-id` when it looks sane,
//! a fresh UUID otherwise. Handlers read it from the request extensions and
//! every response echoes it back, so one id ties the client log, the server
//! log, and the transaction together.

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

// Caller-supplied ids land in logs; anything oversized is replaced.
const MAX_CALLER_ID_LEN: usize = 128;

/// Correlation id of the current request, stored as an extension.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = caller_id(req.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

fn caller_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    if raw.is_empty() || raw.len() > MAX_CALLER_ID_LEN {
        return None;
    }
    Some(raw.to_string())
}
