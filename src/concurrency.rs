//! Optimistic concurrency for posts and users, idempotent likes.
//!
//! No in-process locking: every guarantee comes from a single conditional
//! statement in the store.

use std::sync::Arc;

use crate::database::Database;
use crate::error::{DbError, WriteError};
use crate::models::{Post, User, WriteOutcome};

#[derive(Clone)]
pub struct ConcurrencyGuard {
    db: Arc<dyn Database>,
}

impl ConcurrencyGuard {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Write `post` if its `version` is still the stored one.
    ///
    /// On success the returned post carries the bumped version.
    pub async fn update_post(&self, mut post: Post) -> Result<Post, WriteError> {
        match self.db.update_post(&post).await? {
            WriteOutcome::Applied => {
                post.version += 1;
                Ok(post)
            }
            WriteOutcome::NotApplied => {
                tracing::info!(post_id = post.id, version = post.version, "Post edit conflict");
                Err(WriteError::Conflict)
            }
        }
    }

    /// Write `user` if its `version` is still the stored one.
    pub async fn update_user(&self, mut user: User) -> Result<User, WriteError> {
        match self.db.update_user(&user).await? {
            WriteOutcome::Applied => {
                user.version += 1;
                Ok(user)
            }
            WriteOutcome::NotApplied => {
                tracing::info!(user_id = user.id, version = user.version, "User edit conflict");
                Err(WriteError::Conflict)
            }
        }
    }

    /// Add the user to the post's liker set. Liking twice is a no-op.
    ///
    /// Likes do not touch the post version.
    pub async fn like(&self, post_id: i64, user_id: i64) -> Result<Vec<i64>, DbError> {
        self.db.add_like(post_id, user_id).await
    }

    /// Remove the user from the post's liker set. Absent is a no-op.
    pub async fn unlike(&self, post_id: i64, user_id: i64) -> Result<Vec<i64>, DbError> {
        self.db.remove_like(post_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MockDatabase, SqliteDatabase};
    use crate::models::{NewPost, NewUser, ReadTime};

    async fn guard_with_post() -> (ConcurrencyGuard, Arc<SqliteDatabase>, Post, User) {
        let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let user = db
            .insert_user(&NewUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let post = db
            .insert_post(&NewPost {
                title: "Draft".into(),
                post_text: "body".into(),
                img: "cover.png".into(),
                read_time: ReadTime(4),
                created_by: user.id,
            })
            .await
            .unwrap();
        let guard = ConcurrencyGuard::new(db.clone());
        (guard, db, post, user)
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let (guard, _db, post, _) = guard_with_post().await;

        let mut a = post.clone();
        a.title = "A".into();
        let mut b = post.clone();
        b.title = "B".into();

        let applied = guard.update_post(a).await.unwrap();
        assert_eq!(applied.version, post.version + 1);
        assert!(matches!(guard.update_post(b).await, Err(WriteError::Conflict)));

        let mut retry = applied.clone();
        retry.title = "B".into();
        assert_eq!(guard.update_post(retry).await.unwrap().version, post.version + 2);
    }

    #[tokio::test]
    async fn test_like_twice_single_entry() {
        let (guard, db, post, user) = guard_with_post().await;

        guard.like(post.id, user.id).await.unwrap();
        let likes = guard.like(post.id, user.id).await.unwrap();
        assert_eq!(likes.iter().filter(|id| **id == user.id).count(), 1);

        let stored = db.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(stored.version, post.version);
    }

    #[tokio::test]
    async fn test_unlike_absent_is_noop() {
        let (guard, _db, post, user) = guard_with_post().await;
        let likes = guard.unlike(post.id, user.id).await.unwrap();
        assert!(likes.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_likes_no_duplicates() {
        let (guard, _db, post, user) = guard_with_post().await;

        let (post_id, user_id) = (post.id, user.id);
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let guard = guard.clone();
                tokio::spawn(async move { guard.like(post_id, user_id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let likes = guard.unlike(post.id, 0).await.unwrap();
        assert_eq!(likes, vec![user.id]);
    }

    #[tokio::test]
    async fn test_store_error_is_not_conflict() {
        let mut mock = MockDatabase::new();
        mock.expect_update_user()
            .returning(|_| Err(DbError::Timeout(3000)));
        let guard = ConcurrencyGuard::new(Arc::new(mock));

        let user = User {
            id: 1,
            created_at: chrono::Utc::now(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            activated: false,
            version: 1,
        };
        assert!(matches!(
            guard.update_user(user).await,
            Err(WriteError::Store(DbError::Timeout(_)))
        ));
    }
}
