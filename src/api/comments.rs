use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::http::{AppState, JsonBody, ResourceId};
use crate::models::{validate_comment, CommentView, NewComment};
use crate::validator::Validator;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateCommentInput {
    pub text: String,
    pub post: i64,
}

/// Comments on post `{id}`, oldest first. An unknown post has none.
pub async fn list_comments(
    State(state): State<AppState>,
    ResourceId(post_id): ResourceId,
) -> ApiResult {
    let comments = state.db.list_comments_for_post(post_id).await?;
    Ok(Json(json!({ "comments": comments })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(input): JsonBody<CreateCommentInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let new_comment = NewComment {
        text: input.text.trim().to_string(),
        post_id: input.post,
        created_by: user.id,
    };

    let mut v = Validator::new();
    validate_comment(&mut v, &new_comment.text, new_comment.post_id);
    v.finish()?;

    let comment = state.db.insert_comment(&new_comment).await?;
    tracing::info!(comment_id = comment.id, post_id = comment.post_id, "Comment created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "comment": CommentView::new(comment, user.name) })),
    ))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> ApiResult {
    state.db.delete_comment(id).await?;
    Ok(Json(json!({ "message": "comment deleted successfully" })))
}
