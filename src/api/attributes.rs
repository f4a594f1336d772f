use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use fulltext_index::index::Attribute;

use super::ApiResponse;
use crate::state::AppState;

type Entry = Attribute<i64, String>;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub keys: Vec<i64>,
}

/// GET /api/search?q=... - 搜索
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Json<ApiResponse<Vec<Entry>>> {
    let term = query.q.trim();
    if term.is_empty() {
        return Json(ApiResponse::error("搜索关键词不能为空"));
    }

    match state.index.search(&term.to_string()).await {
        Ok(results) => Json(ApiResponse::success(results)),
        Err(e) if e.is_not_found() => Json(ApiResponse::not_found(&e.to_string())),
        Err(e) => {
            tracing::error!("Search for {:?} failed: {}", term, e);
            Json(ApiResponse::internal(&e.to_string()))
        }
    }
}

/// POST /api/attributes - 批量插入
pub async fn insert(
    State(state): State<Arc<AppState>>,
    Json(attrs): Json<Vec<Entry>>,
) -> Json<ApiResponse<usize>> {
    match state.index.insert(&attrs).await {
        Ok(()) => Json(ApiResponse::success(attrs.len())),
        Err(e) => {
            tracing::error!("Insert of {} attributes failed: {}", attrs.len(), e);
            Json(ApiResponse::internal(&e.to_string()))
        }
    }
}

/// POST /api/attributes/delete - 批量删除
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteRequest>,
) -> Json<ApiResponse<usize>> {
    match state.index.delete(&req.keys).await {
        Ok(()) => Json(ApiResponse::success(req.keys.len())),
        Err(e) => {
            tracing::error!("Delete of {} keys failed: {}", req.keys.len(), e);
            Json(ApiResponse::internal(&e.to_string()))
        }
    }
}
