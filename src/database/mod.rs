//! Persistence layer.
//!
//! Handlers and the token authority only see the `Database` trait. The SQLite
//! implementation lives in `sqlite`; unit tests substitute `MockDatabase`.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbError;
use crate::models::{
    Comment, CommentView, Filters, Metadata, NewComment, NewPost, NewUser, Post, PostView,
    TokenRecord, TokenScope, User, WriteOutcome,
};

/// Every store operation the application needs.
///
/// Conditional writes report `WriteOutcome` instead of an error so callers
/// can tell an edit conflict apart from a missing row.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    /// Insert an unactivated user. A duplicate email is a `Constraint` error.
    async fn insert_user(&self, user: &NewUser) -> Result<User, DbError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Write every mutable field if `user.version` is still current.
    async fn update_user(&self, user: &User) -> Result<WriteOutcome, DbError>;

    /// Owner of a non-expired token with the given digest and scope.
    async fn get_user_for_token(
        &self,
        scope: TokenScope,
        hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DbError>;

    // =========================================================================
    // Tokens
    // =========================================================================

    async fn insert_token(&self, token: &TokenRecord) -> Result<(), DbError>;

    /// Returns the number of deleted tokens.
    async fn delete_tokens_for_user(&self, scope: TokenScope, user_id: i64)
        -> Result<u64, DbError>;

    // =========================================================================
    // Posts
    // =========================================================================

    async fn list_posts(&self, filters: &Filters) -> Result<(Vec<PostView>, Metadata), DbError>;

    async fn get_post(&self, id: i64) -> Result<Option<Post>, DbError>;

    /// The post together with its author's name.
    async fn get_post_with_author(&self, id: i64) -> Result<Option<PostView>, DbError>;

    async fn insert_post(&self, post: &NewPost) -> Result<Post, DbError>;

    /// Write title, text, image and read time if `post.version` is still
    /// current, bumping the version by one.
    async fn update_post(&self, post: &Post) -> Result<WriteOutcome, DbError>;

    async fn delete_post(&self, id: i64) -> Result<(), DbError>;

    /// Add `user_id` to the liker set. Returns the resulting set.
    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<Vec<i64>, DbError>;

    /// Remove `user_id` from the liker set. Returns the resulting set.
    async fn remove_like(&self, post_id: i64, user_id: i64) -> Result<Vec<i64>, DbError>;

    // =========================================================================
    // Comments
    // =========================================================================

    async fn list_comments_for_post(&self, post_id: i64) -> Result<Vec<CommentView>, DbError>;

    /// Fails with `NotFound` when the post does not exist.
    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, DbError>;

    async fn delete_comment(&self, id: i64) -> Result<(), DbError>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> Result<(), DbError>;
}
