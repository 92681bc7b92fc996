use axum::{http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() })),
    )
}
