use axum::response::{IntoResponse, Json};

use crate::dtos::Response;

/// Liveness probe; does not touch the database
pub async fn health_check() -> impl IntoResponse {
    Json(Response {
        status: "success",
        message: "Learning backend is running".to_string(),
    })
}
