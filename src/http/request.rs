//! Request extraction.
//!
//! - `JsonBody<T>`: strict JSON decoding with client-facing messages
//! - `ResourceId`: positive integer `{id}` path parameter

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::ApiError;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// JSON body extractor.
///
/// Rejects empty bodies, trailing values, and unknown fields (when the target
/// type uses `deny_unknown_fields`) with a 400 whose message the client can
/// act on.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::BadRequest(format!(
                    "body cannot be larger than {MAX_BODY_BYTES} bytes"
                ))
            } else {
                ApiError::BadRequest(rejection.body_text())
            }
        })?;

        decode_json(&bytes).map(JsonBody)
    }
}

/// Decode exactly one JSON value from `bytes`.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest("body must not be empty".to_string()));
    }

    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = T::deserialize(&mut de).map_err(|e| describe(bytes, &e))?;

    de.end().map_err(|_| {
        ApiError::BadRequest("body cannot contain more than one JSON value".to_string())
    })?;

    Ok(value)
}

fn describe(bytes: &[u8], err: &serde_json::Error) -> ApiError {
    let at = char_offset(bytes, err.line(), err.column());
    let message = strip_position(&err.to_string());

    let text = match err.classify() {
        Category::Eof => "body contains badly-formed JSON".to_string(),
        Category::Syntax => format!("body contains badly-formed JSON (at character {at})"),
        Category::Data => {
            if let Some(field) = backticked(&message, "unknown field `") {
                format!("body contains unknown field \"{field}\"")
            } else if let Some(field) = backticked(&message, "missing field `") {
                format!("body is missing field \"{field}\"")
            } else if message.starts_with("invalid type") || message.starts_with("invalid value") {
                format!("body contains incorrect JSON type (at character {at})")
            } else {
                // Custom messages from our own Deserialize impls.
                message
            }
        }
        Category::Io => message,
    };

    ApiError::BadRequest(text)
}

/// Byte offset of a 1-based line/column position.
fn char_offset(bytes: &[u8], line: usize, column: usize) -> usize {
    let preceding: usize = bytes
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    preceding + column
}

fn strip_position(message: &str) -> String {
    match message.rfind(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

fn backticked<'a>(message: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = message.strip_prefix(prefix)?;
    rest.split('`').next()
}

/// A positive integer `{id}` path segment. Anything else is a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceId(pub i64);

impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;

        match raw.parse::<i64>() {
            Ok(id) if id >= 1 => Ok(ResourceId(id)),
            _ => Err(ApiError::NotFound),
        }
    }
}
