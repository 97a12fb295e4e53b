//! Post handlers.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::http::{AppState, JsonBody, ResourceId};
use crate::models::{validate_post, Filters, NewPost, PostView, ReadTime};
use crate::validator::Validator;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct CreatePostInput {
    pub title: String,
    pub post_text: String,
    pub read_time: ReadTime,
    pub img: String,
}

/// Partial update. `version` is the one the client last read.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdatePostInput {
    pub version: Option<i64>,
    pub title: Option<String>,
    pub post_text: Option<String>,
    pub read_time: Option<ReadTime>,
    pub img: Option<String>,
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult {
    let mut v = Validator::new();
    let filters = Filters::from_query(&query, &mut v);
    v.finish()?;

    let (posts, metadata) = state.db.list_posts(&filters).await?;
    Ok(Json(json!({ "posts": posts, "metadata": metadata })))
}

pub async fn show_post(State(state): State<AppState>, ResourceId(id): ResourceId) -> ApiResult {
    let post = state
        .db
        .get_post_with_author(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(json!({ "post": post })))
}

pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(input): JsonBody<CreatePostInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let new_post = NewPost {
        title: input.title.trim().to_string(),
        post_text: input.post_text.trim().to_string(),
        img: input.img.trim().to_string(),
        read_time: input.read_time,
        created_by: user.id,
    };

    let mut v = Validator::new();
    validate_post(
        &mut v,
        &new_post.title,
        &new_post.post_text,
        &new_post.img,
        new_post.read_time,
    );
    v.finish()?;

    let post = state.db.insert_post(&new_post).await?;
    tracing::info!(post_id = post.id, user_id = user.id, "Post created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "post": PostView::new(post, user.name) })),
    ))
}

/// Apply a versioned update.
///
/// The write only lands if the stored version still equals the one supplied,
/// so two clients editing from the same read cannot both win.
pub async fn update_post(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    JsonBody(input): JsonBody<UpdatePostInput>,
) -> ApiResult {
    let view = state
        .db
        .get_post_with_author(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let (mut post, author) = view.into_parts();

    let Some(version) = input.version else {
        return Err(ApiError::field("version", "must be provided"));
    };

    post.version = version;
    post.title = input.title.unwrap_or_default().trim().to_string();
    post.post_text = input.post_text.unwrap_or_default().trim().to_string();
    if let Some(img) = input.img {
        post.img = img.trim().to_string();
    }
    if let Some(read_time) = input.read_time {
        post.read_time = read_time;
    }

    let mut v = Validator::new();
    validate_post(&mut v, &post.title, &post.post_text, &post.img, post.read_time);
    v.finish()?;

    let post = state.guard.update_post(post).await?;
    Ok(Json(json!({ "post": PostView::new(post, author) })))
}

pub async fn delete_post(State(state): State<AppState>, ResourceId(id): ResourceId) -> ApiResult {
    state.db.delete_post(id).await?;
    tracing::info!(post_id = id, "Post deleted");
    Ok(Json(json!({ "message": "post deleted successfully" })))
}

pub async fn like_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ResourceId(id): ResourceId,
) -> ApiResult {
    state.guard.like(id, user.id).await?;
    post_envelope(&state, id).await
}

pub async fn dislike_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ResourceId(id): ResourceId,
) -> ApiResult {
    state.guard.unlike(id, user.id).await?;
    post_envelope(&state, id).await
}

async fn post_envelope(state: &AppState, id: i64) -> ApiResult {
    let post = state
        .db
        .get_post_with_author(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "post": post })))
}
