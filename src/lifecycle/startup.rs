//! Startup orchestration.
//!
//! Opens the store named by the config and assembles the shared state. Any
//! failure here is fatal.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{Database, SqliteDatabase};
use crate::error::DbError;
use crate::http::AppState;
use crate::mailer::Mailer;

pub async fn build_state(config: AppConfig, mailer: Arc<dyn Mailer>) -> Result<AppState, DbError> {
    let db = SqliteDatabase::open(&config.database.path, config.database.query_timeout()).await?;
    db.ping().await?;

    tracing::info!(
        path = %config.database.path,
        query_timeout_ms = config.database.query_timeout_ms,
        "Database ready"
    );

    let db: Arc<dyn Database> = Arc::new(db);
    Ok(AppState::new(config, db, mailer))
}
