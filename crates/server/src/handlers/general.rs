//! # General Route Handlers
//!
//! The root and health check endpoints.

use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// The handler for the root (`/`) endpoint.
pub async fn root() -> &'static str {
    "invoice-parser server is running."
}

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "invoice-parser-api".to_string(),
    })
}
