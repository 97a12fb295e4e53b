//! Account handlers: registration, activation, login, logout, password change.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiResult;
use crate::auth::{is_valid_token_format, CredentialHasher, CurrentUser, TOKEN_PLAINTEXT_LEN};
use crate::error::{ApiError, DbError, TokenError};
use crate::http::{AppState, JsonBody};
use crate::mailer::{send_in_background, Mail};
use crate::models::{
    validate_email, validate_name, validate_password_plaintext, NewUser, TokenScope,
};
use crate::validator::Validator;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivateInput {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

/// Create an unactivated account and mail its activation token.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = input.name.trim().to_string();
    let email = input.email.trim().to_string();

    let mut v = Validator::new();
    validate_name(&mut v, &name);
    validate_email(&mut v, &email);
    validate_password_plaintext(&mut v, "password", &input.password);
    v.finish()?;

    let password_hash = hash_password(state.hasher.clone(), input.password).await?;

    let user = state
        .db
        .insert_user(&NewUser {
            name,
            email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            DbError::Constraint(_) => {
                ApiError::field("email", "a user with this email address already exists")
            }
            other => other.into(),
        })?;

    let token = state
        .authority
        .issue(
            user.id,
            state.config.tokens.activation_ttl(),
            TokenScope::Activation,
        )
        .await?;

    send_in_background(state.mailer.clone(), Mail::welcome(&user, &token));
    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::ACCEPTED, Json(json!({ "user": user }))))
}

/// Redeem an activation token. The token is consumed on success.
pub async fn activate(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ActivateInput>,
) -> ApiResult {
    let plaintext = input.token.trim();

    let mut v = Validator::new();
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(
        is_valid_token_format(plaintext),
        "token",
        &format!("must be {TOKEN_PLAINTEXT_LEN} bytes long"),
    );
    v.finish()?;

    let mut user = match state.authority.resolve(TokenScope::Activation, plaintext).await {
        Ok(user) => user,
        Err(TokenError::Malformed | TokenError::NotFound) => {
            return Err(ApiError::field("token", "invalid or expired activation token"));
        }
        Err(err @ TokenError::ExpiryOutOfRange) => return Err(err.into()),
        Err(TokenError::Store(e)) => return Err(e.into()),
    };

    user.activated = true;
    let user = state.guard.update_user(user).await?;

    state
        .authority
        .revoke_all(TokenScope::Activation, user.id)
        .await?;
    tracing::info!(user_id = user.id, "User activated");

    Ok(Json(json!({ "user": user })))
}

/// Exchange credentials for an authentication token.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let email = input.email.trim().to_string();

    let mut v = Validator::new();
    validate_email(&mut v, &email);
    validate_password_plaintext(&mut v, "password", &input.password);
    v.finish()?;

    let user = state
        .db
        .get_user_by_email(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(state.hasher.clone(), input.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = user.id, "Login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .authority
        .issue(
            user.id,
            state.config.tokens.authentication_ttl(),
            TokenScope::Authentication,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "authentication_token": token, "userName": user.name })),
    ))
}

/// Revoke every authentication token the caller holds.
pub async fn logout(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult {
    state
        .authority
        .revoke_all(TokenScope::Authentication, user.id)
        .await?;
    tracing::info!(user_id = user.id, "User logged out");

    Ok(Json(json!({ "message": "you have been logged out" })))
}

/// Replace the caller's password and end all of their sessions.
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(input): JsonBody<ChangePasswordInput>,
) -> ApiResult {
    let mut v = Validator::new();
    v.check(
        !input.current_password.is_empty(),
        "currentPassword",
        "must be provided",
    );
    validate_password_plaintext(&mut v, "newPassword", &input.new_password);
    v.finish()?;

    let matches = verify_password(
        state.hasher.clone(),
        input.current_password,
        user.password_hash.clone(),
    )
    .await?;
    if !matches {
        return Err(ApiError::InvalidCredentials);
    }

    let mut user = user;
    user.password_hash = hash_password(state.hasher.clone(), input.new_password).await?;
    let user = state.guard.update_user(user).await?;

    state
        .authority
        .revoke_all(TokenScope::Authentication, user.id)
        .await?;
    tracing::info!(user_id = user.id, "Password changed");

    Ok(Json(json!({ "message": "your password was successfully updated" })))
}

// Argon2 blocks for tens of milliseconds, so it runs on the blocking pool.
async fn hash_password(
    hasher: Arc<dyn CredentialHasher>,
    password: String,
) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)
}

async fn verify_password(
    hasher: Arc<dyn CredentialHasher>,
    password: String,
    hash: String,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(ApiError::internal)
}
