use axum::{extract::State, Json};
use serde_json::json;

use super::ApiResult;
use crate::http::AppState;

/// Report availability along with the running environment and version.
///
/// Pings the store so an unreachable database reports as a 500.
pub async fn healthcheck(State(state): State<AppState>) -> ApiResult {
    state.db.ping().await?;

    Ok(Json(json!({
        "status": "available",
        "systemInfo": {
            "environment": state.config.environment.to_string(),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })))
}
