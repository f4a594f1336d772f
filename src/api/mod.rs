pub mod attributes;
pub mod server;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> Self {
        Self::with_code(400, message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::with_code(404, message)
    }

    pub fn internal(message: &str) -> Self {
        Self::with_code(500, message)
    }

    fn with_code(code: i32, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: None,
        }
    }
}

/// All HTTP routes of the server / 路由表
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(server::health_check))
        .route("/api/search", get(attributes::search))
        .route("/api/attributes", post(attributes::insert))
        .route("/api/attributes/delete", post(attributes::delete))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
