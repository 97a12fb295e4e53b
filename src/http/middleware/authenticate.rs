//! Authentication middleware.
//! Resolves the bearer token and attaches an `Identity` to every request.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{Identity, TokenAuthority};
use crate::error::{ApiError, TokenError};
use crate::models::TokenScope;

pub async fn authenticate_middleware(
    State(authority): State<TokenAuthority>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let authorization = req.headers().get(header::AUTHORIZATION).cloned();
    let identity = match resolve_identity(&authority, authorization).await {
        Ok(identity) => identity,
        Err(err) => return with_vary(err.into_response()),
    };

    if let Identity::User(user) = &identity {
        tracing::Span::current().record("user_id", user.id);
    }

    req.extensions_mut().insert(identity);
    with_vary(next.run(req).await)
}

// Takes the header by value: the request body is not `Sync`, so the request
// cannot be borrowed across the lookup.
async fn resolve_identity(
    authority: &TokenAuthority,
    authorization: Option<HeaderValue>,
) -> Result<Identity, ApiError> {
    // 1. No header at all means an anonymous caller.
    let Some(value) = authorization else {
        return Ok(Identity::Anonymous);
    };

    // 2. Exactly "Bearer <token>".
    let value = value
        .to_str()
        .map_err(|_| ApiError::InvalidAuthenticationToken)?;
    let parts: Vec<&str> = value.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(ApiError::InvalidAuthenticationToken);
    };
    if *scheme != "Bearer" {
        return Err(ApiError::InvalidAuthenticationToken);
    }

    // 3. Resolve within the authentication scope.
    match authority.resolve(TokenScope::Authentication, token).await {
        Ok(user) => Ok(Identity::User(user)),
        Err(TokenError::Malformed | TokenError::NotFound) => {
            Err(ApiError::InvalidAuthenticationToken)
        }
        Err(err @ TokenError::ExpiryOutOfRange) => Err(err.into()),
        Err(TokenError::Store(e)) => Err(ApiError::internal(e)),
    }
}

fn with_vary(mut response: Response) -> Response {
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}
