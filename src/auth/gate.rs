//! Per-route authorization.
//!
//! The gate never looks at credentials. It only inspects the `Identity` the
//! authentication middleware already attached to the request.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};

use super::identity::Identity;
use crate::error::ApiError;
use crate::models::User;

/// Access level a route requires. Each level includes the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Access {
    Public,
    Authenticated,
    Activated,
}

impl Access {
    /// Decide whether `identity` may proceed.
    pub fn check(self, identity: &Identity) -> Result<(), ApiError> {
        if self >= Access::Authenticated && identity.is_anonymous() {
            return Err(ApiError::AuthenticationRequired);
        }
        if self >= Access::Activated && !identity.is_activated() {
            return Err(ApiError::InactiveAccount);
        }
        Ok(())
    }
}

fn identity_of(extensions: &axum::http::Extensions) -> Result<&Identity, ApiError> {
    extensions
        .get::<Identity>()
        .ok_or_else(|| ApiError::internal("identity missing from request; authentication layer not installed"))
}

/// Route layer enforcing `access`.
///
/// Install with `middleware::from_fn_with_state(Access::Activated, require_access)`.
pub async fn require_access(
    State(access): State<Access>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    access.check(identity_of(request.extensions())?)?;
    Ok(next.run(request).await)
}

/// Extractor for handlers behind an authenticated or activated gate.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match identity_of(&parts.extensions)? {
            Identity::User(user) => Ok(CurrentUser(user.clone())),
            Identity::Anonymous => Err(ApiError::AuthenticationRequired),
        }
    }
}
