//! # Health Check Handler

use axum::Json;
use chrono::Utc;
use serde_json::json;

/// Liveness probe: `GET /health`. No database round-trip; the export
/// endpoint surfaces store failures on its own.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "steward-core",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
