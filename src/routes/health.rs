use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET /health — reports PostgreSQL and Redis reachability.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected".to_string(),
        Err(e) => e.to_string(),
    };

    let mut redis = state.redis.clone();
    let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut redis).await;
    let sessions = match pong {
        Ok(_) => "connected".to_string(),
        Err(e) => e.to_string(),
    };

    if db == "connected" && sessions == "connected" {
        (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": db, "redis": sessions })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "db": db, "redis": sessions })),
        )
    }
}
