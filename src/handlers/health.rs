use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// GET /health - liveness plus a storage round trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.adapter.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "version": env!("CARGO_PKG_VERSION"),
                    "store": "ok",
                    "oauth_providers": state.oauth.provider_ids()
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "store unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store_error": e.to_string()
                    }
                })),
            )
        }
    }
}
