//! SQLite implementation of the Database trait
//!
//! Every call runs on the tokio-rusqlite worker thread and is bounded by the
//! configured query timeout.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use tokio_rusqlite::Connection;

use super::migrations::CREATE_SCHEMA;
use super::Database;
use crate::error::DbError;
use crate::models::{
    Comment, CommentView, Filters, Metadata, NewComment, NewPost, NewUser, Post, PostView,
    ReadTime, TokenRecord, TokenScope, User, WriteOutcome,
};

/// Default per-query deadline.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// SQLite database implementation
pub struct SqliteDatabase {
    conn: Connection,
    query_timeout: Duration,
}

impl SqliteDatabase {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// Use `:memory:` for an in-memory database.
    pub async fn open(path: &str, query_timeout: Duration) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await?;

        tracing::debug!(path = %path, "Database schema applied");

        Ok(Self {
            conn,
            query_timeout,
        })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::open(":memory:", DEFAULT_QUERY_TIMEOUT).await
    }

    /// Run `function` on the connection thread, bounded by the query timeout.
    ///
    /// A timeout abandons the wait, not the statement: the closure still runs
    /// to completion and a write inside it may commit after the caller got
    /// `DbError::Timeout`. Each write closure is a single versioned statement,
    /// so a client retrying with the version it read gets `NotApplied` instead
    /// of writing twice.
    async fn run<F, R>(&self, function: F) -> Result<R, DbError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        match tokio::time::timeout(self.query_timeout, self.conn.call(function)).await {
            Ok(result) => result.map_err(DbError::from),
            Err(_) => Err(DbError::Timeout(self.query_timeout.as_millis() as u64)),
        }
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Current time truncated to the precision the store keeps.
fn now_millis() -> (i64, DateTime<Utc>) {
    let ms = Utc::now().timestamp_millis();
    (ms, millis_to_datetime(ms))
}

const USER_COLUMNS: &str = "u.id, u.created_at, u.name, u.email, u.password_hash, u.activated, u.version";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        created_at: millis_to_datetime(row.get(1)?),
        name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        activated: row.get(5)?,
        version: row.get(6)?,
    })
}

const POST_COLUMNS: &str =
    "p.id, p.created_at, p.title, p.post_text, p.img, p.read_time, p.created_by, p.version";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        created_at: millis_to_datetime(row.get(1)?),
        title: row.get(2)?,
        post_text: row.get(3)?,
        img: row.get(4)?,
        read_time: ReadTime(row.get(5)?),
        created_by: row.get(6)?,
        version: row.get(7)?,
        liked_by: Vec::new(),
    })
}

fn liked_by(conn: &rusqlite::Connection, post_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT user_id FROM post_likes WHERE post_id = ?1 ORDER BY rowid",
    )?;
    let ids = stmt
        .query_map([post_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn post_exists(conn: &rusqlite::Connection, post_id: i64) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM posts WHERE id = ?1", [post_id], |_| Ok(()))
        .optional()
        .map(|found| found.is_some())
}

#[async_trait]
impl Database for SqliteDatabase {
    // =========================================================================
    // Users
    // =========================================================================

    async fn insert_user(&self, user: &NewUser) -> Result<User, DbError> {
        let name = user.name.clone();
        let email = user.email.clone();
        let password_hash = user.password_hash.clone();

        self.run(move |conn| {
            let (created_ms, created_at) = now_millis();
            conn.execute(
                r#"
                INSERT INTO users (created_at, name, email, password_hash, activated, version)
                VALUES (?1, ?2, ?3, ?4, 0, 1)
                "#,
                rusqlite::params![created_ms, name, email, password_hash],
            )?;

            Ok(User {
                id: conn.last_insert_rowid(),
                created_at,
                name,
                email,
                password_hash,
                activated: false,
                version: 1,
            })
        })
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = email.to_string();

        self.run(move |conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?1");
            let user = conn.query_row(&sql, [&email], user_from_row).optional()?;
            Ok(user)
        })
        .await
    }

    async fn update_user(&self, user: &User) -> Result<WriteOutcome, DbError> {
        let user = user.clone();

        self.run(move |conn| {
            let rows = conn.execute(
                r#"
                UPDATE users
                SET name = ?1, email = ?2, password_hash = ?3, activated = ?4, version = version + 1
                WHERE id = ?5 AND version = ?6
                "#,
                rusqlite::params![
                    user.name,
                    user.email,
                    user.password_hash,
                    user.activated,
                    user.id,
                    user.version
                ],
            )?;
            Ok(WriteOutcome::from_rows_affected(rows))
        })
        .await
    }

    async fn get_user_for_token(
        &self,
        scope: TokenScope,
        hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DbError> {
        let hash = hash.to_vec();
        let now_ms = now.timestamp_millis();

        self.run(move |conn| {
            let sql = format!(
                r#"
                SELECT {USER_COLUMNS}
                FROM users u
                INNER JOIN tokens t ON t.user_id = u.id
                WHERE t.hash = ?1 AND t.scope = ?2 AND t.expiry > ?3
                "#
            );
            let user = conn
                .query_row(
                    &sql,
                    rusqlite::params![hash, scope.as_str(), now_ms],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    async fn insert_token(&self, token: &TokenRecord) -> Result<(), DbError> {
        let hash = token.hash.clone();
        let user_id = token.user_id;
        let expiry = token.expiry.timestamp_millis();
        let scope = token.scope.as_str();

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO tokens (hash, user_id, expiry, scope) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![hash, user_id, expiry, scope],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_tokens_for_user(
        &self,
        scope: TokenScope,
        user_id: i64,
    ) -> Result<u64, DbError> {
        self.run(move |conn| {
            let count = conn.execute(
                "DELETE FROM tokens WHERE scope = ?1 AND user_id = ?2",
                rusqlite::params![scope.as_str(), user_id],
            )?;
            Ok(count as u64)
        })
        .await
    }

    // =========================================================================
    // Posts
    // =========================================================================

    async fn list_posts(&self, filters: &Filters) -> Result<(Vec<PostView>, Metadata), DbError> {
        let filters = filters.clone();

        self.run(move |conn| {
            // ORDER BY comes from the SortKey safelist, never from raw input.
            let sql = format!(
                r#"
                SELECT count(*) OVER(), {POST_COLUMNS}, u.name,
                    (SELECT count(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count
                FROM posts p
                INNER JOIN users u ON p.created_by = u.id
                WHERE (?1 = '' OR p.title LIKE '%' || ?1 || '%')
                AND (?2 = 0 OR p.created_by = ?2)
                ORDER BY {}
                LIMIT ?3 OFFSET ?4
                "#,
                filters.sort.order_by()
            );

            let mut total_records = 0i64;
            let mut rows = Vec::new();
            {
                let mut stmt = conn.prepare(&sql)?;
                let mut query = stmt.query(rusqlite::params![
                    filters.title,
                    filters.author_id,
                    filters.limit(),
                    filters.offset()
                ])?;
                while let Some(row) = query.next()? {
                    total_records = row.get(0)?;
                    let post = Post {
                        id: row.get(1)?,
                        created_at: millis_to_datetime(row.get(2)?),
                        title: row.get(3)?,
                        post_text: row.get(4)?,
                        img: row.get(5)?,
                        read_time: ReadTime(row.get(6)?),
                        created_by: row.get(7)?,
                        version: row.get(8)?,
                        liked_by: Vec::new(),
                    };
                    let user_name: String = row.get(9)?;
                    rows.push((post, user_name));
                }
            }

            let mut posts = Vec::with_capacity(rows.len());
            for (mut post, user_name) in rows {
                post.liked_by = liked_by(conn, post.id)?;
                posts.push(PostView::new(post, user_name));
            }

            let metadata = Metadata::calculate(total_records, filters.page, filters.limit);
            Ok((posts, metadata))
        })
        .await
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, DbError> {
        if id < 1 {
            return Ok(None);
        }

        self.run(move |conn| {
            let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1");
            let post = conn.query_row(&sql, [id], post_from_row).optional()?;
            match post {
                Some(mut post) => {
                    post.liked_by = liked_by(conn, post.id)?;
                    Ok(Some(post))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn get_post_with_author(&self, id: i64) -> Result<Option<PostView>, DbError> {
        if id < 1 {
            return Ok(None);
        }

        self.run(move |conn| {
            let sql = format!(
                r#"
                SELECT {POST_COLUMNS}, u.name
                FROM posts p
                INNER JOIN users u ON p.created_by = u.id
                WHERE p.id = ?1
                "#
            );
            let found = conn
                .query_row(&sql, [id], |row| Ok((post_from_row(row)?, row.get::<_, String>(8)?)))
                .optional()?;
            match found {
                Some((mut post, user_name)) => {
                    post.liked_by = liked_by(conn, post.id)?;
                    Ok(Some(PostView::new(post, user_name)))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post, DbError> {
        let post = post.clone();

        self.run(move |conn| {
            let (created_ms, created_at) = now_millis();
            conn.execute(
                r#"
                INSERT INTO posts (created_at, title, post_text, img, read_time, created_by, version)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
                "#,
                rusqlite::params![
                    created_ms,
                    post.title,
                    post.post_text,
                    post.img,
                    post.read_time.minutes(),
                    post.created_by
                ],
            )?;

            Ok(Post {
                id: conn.last_insert_rowid(),
                created_at,
                title: post.title,
                post_text: post.post_text,
                img: post.img,
                read_time: post.read_time,
                created_by: post.created_by,
                version: 1,
                liked_by: Vec::new(),
            })
        })
        .await
    }

    async fn update_post(&self, post: &Post) -> Result<WriteOutcome, DbError> {
        let post = post.clone();

        self.run(move |conn| {
            let rows = conn.execute(
                r#"
                UPDATE posts
                SET title = ?1, post_text = ?2, img = ?3, read_time = ?4, version = version + 1
                WHERE id = ?5 AND version = ?6
                "#,
                rusqlite::params![
                    post.title,
                    post.post_text,
                    post.img,
                    post.read_time.minutes(),
                    post.id,
                    post.version
                ],
            )?;
            Ok(WriteOutcome::from_rows_affected(rows))
        })
        .await
    }

    async fn delete_post(&self, id: i64) -> Result<(), DbError> {
        if id < 1 {
            return Err(DbError::NotFound);
        }

        let rows = self
            .run(move |conn| Ok(conn.execute("DELETE FROM posts WHERE id = ?1", [id])?))
            .await?;

        if rows == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<Vec<i64>, DbError> {
        let likes = self
            .run(move |conn| {
                let tx = conn.transaction()?;
                if !post_exists(&tx, post_id)? {
                    return Ok(None);
                }
                tx.execute(
                    "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                    [post_id, user_id],
                )?;
                let likes = liked_by(&tx, post_id)?;
                tx.commit()?;
                Ok(Some(likes))
            })
            .await?;

        likes.ok_or(DbError::NotFound)
    }

    async fn remove_like(&self, post_id: i64, user_id: i64) -> Result<Vec<i64>, DbError> {
        let likes = self
            .run(move |conn| {
                let tx = conn.transaction()?;
                if !post_exists(&tx, post_id)? {
                    return Ok(None);
                }
                tx.execute(
                    "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                    [post_id, user_id],
                )?;
                let likes = liked_by(&tx, post_id)?;
                tx.commit()?;
                Ok(Some(likes))
            })
            .await?;

        likes.ok_or(DbError::NotFound)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    async fn list_comments_for_post(&self, post_id: i64) -> Result<Vec<CommentView>, DbError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT c.id, c.created_at, c.text, c.post_id, c.created_by, u.name
                FROM comments c
                INNER JOIN users u ON c.created_by = u.id
                WHERE c.post_id = ?1
                ORDER BY c.id
                "#,
            )?;

            let comments = stmt
                .query_map([post_id], |row| {
                    let comment = Comment {
                        id: row.get(0)?,
                        created_at: millis_to_datetime(row.get(1)?),
                        text: row.get(2)?,
                        post_id: row.get(3)?,
                        created_by: row.get(4)?,
                    };
                    Ok(CommentView::new(comment, row.get::<_, String>(5)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(comments)
        })
        .await
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, DbError> {
        let comment = comment.clone();

        let inserted = self
            .run(move |conn| {
                if !post_exists(conn, comment.post_id)? {
                    return Ok(None);
                }

                let (created_ms, created_at) = now_millis();
                conn.execute(
                    "INSERT INTO comments (created_at, text, post_id, created_by) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![created_ms, comment.text, comment.post_id, comment.created_by],
                )?;

                Ok(Some(Comment {
                    id: conn.last_insert_rowid(),
                    created_at,
                    text: comment.text,
                    post_id: comment.post_id,
                    created_by: comment.created_by,
                }))
            })
            .await?;

        inserted.ok_or(DbError::NotFound)
    }

    async fn delete_comment(&self, id: i64) -> Result<(), DbError> {
        if id < 1 {
            return Err(DbError::NotFound);
        }

        let rows = self
            .run(move |conn| Ok(conn.execute("DELETE FROM comments WHERE id = ?1", [id])?))
            .await?;

        if rows == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::models::SortKey;

    async fn db_with_author() -> (SqliteDatabase, User) {
        let db = SqliteDatabase::in_memory().await.unwrap();
        let user = db
            .insert_user(&NewUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        (db, user)
    }

    fn new_post(title: &str, author: i64) -> NewPost {
        NewPost {
            title: title.into(),
            post_text: "body".into(),
            img: "cover.png".into(),
            read_time: ReadTime(5),
            created_by: author,
        }
    }

    // Test 1: Create in-memory database
    #[tokio::test]
    async fn test_create_in_memory_database() {
        let db = SqliteDatabase::in_memory().await;
        assert!(db.is_ok());
        assert!(db.unwrap().ping().await.is_ok());
    }

    // Test 2: Duplicate email is a constraint violation
    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (db, _) = db_with_author().await;
        let result = db
            .insert_user(&NewUser {
                name: "Other".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await;
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }

    // Test 3: Token lookup honours scope and expiry
    #[tokio::test]
    async fn test_get_user_for_token() {
        let (db, user) = db_with_author().await;
        let now = Utc::now();
        db.insert_token(&TokenRecord {
            hash: vec![1; 32],
            user_id: user.id,
            expiry: now + ChronoDuration::hours(1),
            scope: TokenScope::Activation,
        })
        .await
        .unwrap();

        let found = db
            .get_user_for_token(TokenScope::Activation, &[1; 32], now)
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let wrong_scope = db
            .get_user_for_token(TokenScope::Authentication, &[1; 32], now)
            .await
            .unwrap();
        assert!(wrong_scope.is_none());

        let expired = db
            .get_user_for_token(
                TokenScope::Activation,
                &[1; 32],
                now + ChronoDuration::hours(2),
            )
            .await
            .unwrap();
        assert!(expired.is_none());
    }

    // Test 4: Revoking deletes only the given scope
    #[tokio::test]
    async fn test_delete_tokens_for_user() {
        let (db, user) = db_with_author().await;
        let expiry = Utc::now() + ChronoDuration::hours(1);
        for (byte, scope) in [
            (1u8, TokenScope::Authentication),
            (2, TokenScope::Authentication),
            (3, TokenScope::Activation),
        ] {
            db.insert_token(&TokenRecord {
                hash: vec![byte; 32],
                user_id: user.id,
                expiry,
                scope,
            })
            .await
            .unwrap();
        }

        let removed = db
            .delete_tokens_for_user(TokenScope::Authentication, user.id)
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let activation = db
            .get_user_for_token(TokenScope::Activation, &[3; 32], Utc::now())
            .await
            .unwrap();
        assert!(activation.is_some());
    }

    // Test 5: Versioned update applies once per observed version
    #[tokio::test]
    async fn test_update_post_version_check() {
        let (db, user) = db_with_author().await;
        let post = db.insert_post(&new_post("First", user.id)).await.unwrap();
        assert_eq!(post.version, 1);

        let mut first = post.clone();
        first.title = "Edited once".into();
        let mut second = post.clone();
        second.title = "Edited twice".into();

        assert_eq!(db.update_post(&first).await.unwrap(), WriteOutcome::Applied);
        assert_eq!(
            db.update_post(&second).await.unwrap(),
            WriteOutcome::NotApplied
        );

        let stored = db.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.title, "Edited once");

        // Retrying with the fresh version succeeds
        let mut retry = stored.clone();
        retry.title = "Edited twice".into();
        assert_eq!(db.update_post(&retry).await.unwrap(), WriteOutcome::Applied);
        assert_eq!(db.get_post(post.id).await.unwrap().unwrap().version, 3);
    }

    // Test 6: Concurrent updates from the same version yield exactly one winner
    #[tokio::test]
    async fn test_concurrent_updates_one_winner() {
        let (db, user) = db_with_author().await;
        let db = Arc::new(db);
        let post = db.insert_post(&new_post("Race", user.id)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let db = Arc::clone(&db);
            let mut edit = post.clone();
            edit.title = format!("Edit {i}");
            handles.push(tokio::spawn(async move { db.update_post(&edit).await }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == WriteOutcome::Applied {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(db.get_post(post.id).await.unwrap().unwrap().version, 2);
    }

    // Test 7: Likes form a set and never touch the version
    #[tokio::test]
    async fn test_like_is_idempotent() {
        let (db, user) = db_with_author().await;
        let post = db.insert_post(&new_post("Likeable", user.id)).await.unwrap();

        assert_eq!(db.add_like(post.id, user.id).await.unwrap(), vec![user.id]);
        assert_eq!(db.add_like(post.id, user.id).await.unwrap(), vec![user.id]);

        assert!(db.remove_like(post.id, user.id).await.unwrap().is_empty());
        assert!(db.remove_like(post.id, user.id).await.unwrap().is_empty());

        assert_eq!(db.get_post(post.id).await.unwrap().unwrap().version, 1);
        assert!(matches!(
            db.add_like(9999, user.id).await,
            Err(DbError::NotFound)
        ));
    }

    // Test 8: Listing honours title filter, sorting and pagination
    #[tokio::test]
    async fn test_list_posts() {
        let (db, user) = db_with_author().await;
        for title in ["Rust ownership", "Async Rust", "Gardening"] {
            db.insert_post(&new_post(title, user.id)).await.unwrap();
        }

        let filters = Filters {
            title: "rust".into(),
            ..Filters::default()
        };
        let (posts, metadata) = db.list_posts(&filters).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "Async Rust");
        assert_eq!(posts[0].user_name, "Ada");
        assert_eq!(metadata.total_records, 2);

        let filters = Filters {
            limit: 1,
            page: 2,
            sort: SortKey::parse("title").unwrap(),
            ..Filters::default()
        };
        let (posts, metadata) = db.list_posts(&filters).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Gardening");
        assert_eq!(metadata.last_page, 3);

        let none = Filters {
            title: "cooking".into(),
            ..Filters::default()
        };
        let (posts, metadata) = db.list_posts(&none).await.unwrap();
        assert!(posts.is_empty());
        assert_eq!(metadata, Metadata::default());
    }

    // Test 9: Comments require an existing post and are removed with it
    #[tokio::test]
    async fn test_comments_lifecycle() {
        let (db, user) = db_with_author().await;
        let post = db.insert_post(&new_post("Discuss", user.id)).await.unwrap();

        let missing = db
            .insert_comment(&NewComment {
                text: "hello".into(),
                post_id: 4242,
                created_by: user.id,
            })
            .await;
        assert!(matches!(missing, Err(DbError::NotFound)));

        let comment = db
            .insert_comment(&NewComment {
                text: "hello".into(),
                post_id: post.id,
                created_by: user.id,
            })
            .await
            .unwrap();

        let comments = db.list_comments_for_post(post.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].user_name, "Ada");

        db.delete_post(post.id).await.unwrap();
        assert!(db.list_comments_for_post(post.id).await.unwrap().is_empty());
        assert!(matches!(
            db.delete_comment(comment.id).await,
            Err(DbError::NotFound)
        ));
    }

    // Test 10: User updates are conditional on version
    #[tokio::test]
    async fn test_update_user_version_check() {
        let (db, mut user) = db_with_author().await;
        user.activated = true;
        assert_eq!(db.update_user(&user).await.unwrap(), WriteOutcome::Applied);
        assert_eq!(
            db.update_user(&user).await.unwrap(),
            WriteOutcome::NotApplied
        );

        let stored = db.get_user_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(stored.activated);
        assert_eq!(stored.version, 2);
    }

    // Test 11: A timed-out write still lands, and the retry sees the new version
    #[tokio::test]
    async fn test_timed_out_write_is_not_repeated() {
        let db = SqliteDatabase::open(":memory:", Duration::from_millis(50))
            .await
            .unwrap();
        let author = db
            .insert_user(&NewUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let post = db.insert_post(&new_post("slow", author.id)).await.unwrap();

        let id = post.id;
        let result = db
            .run(move |conn| {
                std::thread::sleep(Duration::from_millis(300));
                let rows = conn.execute(
                    "UPDATE posts SET version = version + 1 WHERE id = ?1 AND version = 1",
                    rusqlite::params![id],
                )?;
                Ok(rows)
            })
            .await;
        assert!(matches!(result, Err(DbError::Timeout(50))));

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(
            db.update_post(&post).await.unwrap(),
            WriteOutcome::NotApplied
        );
        let stored = db.get_post_with_author(id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }
}
