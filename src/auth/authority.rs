//! Issuing, resolving, and revoking bearer tokens.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::token::{generate_token, hash_token, is_valid_token_format};
use crate::database::Database;
use crate::error::TokenError;
use crate::models::{IssuedToken, TokenRecord, TokenScope, User};

/// Owns the token lifecycle on top of the store.
///
/// The plaintext leaves this type exactly once, in the `IssuedToken` returned
/// by `issue`. Lookups compare digests, and expiry is enforced by the lookup
/// itself, so expired records are simply never matched.
#[derive(Clone)]
pub struct TokenAuthority {
    db: Arc<dyn Database>,
}

impl TokenAuthority {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Generate a token for `user_id` valid for `ttl` and persist its digest.
    pub async fn issue(
        &self,
        user_id: i64,
        ttl: Duration,
        scope: TokenScope,
    ) -> Result<IssuedToken, TokenError> {
        let expiry = Utc::now()
            .checked_add_signed(ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let (plaintext, hash) = generate_token();

        self.db
            .insert_token(&TokenRecord {
                hash,
                user_id,
                expiry,
                scope,
            })
            .await?;

        tracing::debug!(user_id, scope = %scope, "Token issued");

        Ok(IssuedToken {
            plaintext,
            user_id,
            expiry,
            scope,
        })
    }

    /// Resolve a presented plaintext to the user owning it within `scope`.
    pub async fn resolve(&self, scope: TokenScope, plaintext: &str) -> Result<User, TokenError> {
        self.resolve_at(scope, plaintext, Utc::now()).await
    }

    /// Same as `resolve`, evaluated at `now`.
    pub async fn resolve_at(
        &self,
        scope: TokenScope,
        plaintext: &str,
        now: DateTime<Utc>,
    ) -> Result<User, TokenError> {
        if !is_valid_token_format(plaintext) {
            return Err(TokenError::Malformed);
        }

        let hash = hash_token(plaintext);
        self.db
            .get_user_for_token(scope, &hash, now)
            .await?
            .ok_or(TokenError::NotFound)
    }

    /// Delete every token `user_id` holds in `scope`.
    pub async fn revoke_all(&self, scope: TokenScope, user_id: i64) -> Result<u64, TokenError> {
        let removed = self.db.delete_tokens_for_user(scope, user_id).await?;
        tracing::debug!(user_id, scope = %scope, removed, "Tokens revoked");
        Ok(removed)
    }
}
