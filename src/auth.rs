//! Client credential checks, run before any session logic.

use axum::http::{header, HeaderMap};
use serde_json::Value;

use crate::error::AuthError;

/// Query parameter and body field that may carry the credential.
pub const TOKEN_FIELD: &str = "access_token";

/// Credential presented by the client: `Authorization: Bearer` header, then
/// the query parameter, then a field of a JSON object body.
pub fn extract_token<'a>(
    headers: &'a HeaderMap,
    query: Option<&'a str>,
    body: Option<&'a Value>,
) -> Option<&'a str> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token);
    }

    if let Some(token) = query.filter(|t| !t.is_empty()) {
        return Some(token);
    }

    body.and_then(|b| b.get(TOKEN_FIELD))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
}

pub fn authorize(expected: &str, presented: Option<&str>) -> Result<(), AuthError> {
    match presented {
        None => Err(AuthError::Missing),
        Some(token) if token == expected => Ok(()),
        Some(_) => Err(AuthError::Invalid),
    }
}
