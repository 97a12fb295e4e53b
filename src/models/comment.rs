//! Comments on posts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::validator::Validator;

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub post_id: i64,
    pub created_by: i64,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: String,
    pub post_id: i64,
    pub created_by: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub created_by: i64,
    #[serde(rename = "post")]
    pub post_id: i64,
    pub user_name: String,
}

impl CommentView {
    pub fn new(comment: Comment, user_name: impl Into<String>) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            created_by: comment.created_by,
            post_id: comment.post_id,
            user_name: user_name.into(),
        }
    }
}

pub fn validate_comment(v: &mut Validator, text: &str, post_id: i64) {
    v.check(!text.is_empty(), "text", "Comment cannot be empty");
    v.check(
        text.len() <= 200,
        "text",
        "Comment can only contain 200 characters or less",
    );
    v.check(post_id != 0, "post", "Post id must be provided");
    v.check(post_id > 0, "post", "Post id must be valid");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_comment() {
        let mut v = Validator::new();
        validate_comment(&mut v, "", 0);
        assert_eq!(v.errors()["text"], "Comment cannot be empty");
        assert_eq!(v.errors()["post"], "Post id must be provided");

        let mut v = Validator::new();
        validate_comment(&mut v, "nice", -3);
        assert_eq!(v.errors()["post"], "Post id must be valid");
    }
}
