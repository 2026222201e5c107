//! HTTP query API over a loaded [`JoinedFlowStore`] snapshot.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::core::join::JoinedFlowStore;
use crate::core::query::{parse_direction, parse_limit, FlowQueryEngine, DEFAULT_LIMIT};
use crate::utils::error::FlowError;

/// 每個請求共用同一份不可變的 store；重新載入時整個換掉 Arc
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<JoinedFlowStore>,
    pub default_limit: usize,
}

impl AppState {
    pub fn new(store: Arc<JoinedFlowStore>) -> Self {
        Self {
            store,
            default_limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, default_limit: usize) -> Self {
        self.default_limit = default_limit;
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/flows/:area_code", get(get_flows))
        .route("/health", get(health))
        // 前端沿用的路徑
        .route("/api/flows/:area_code", get(get_flows))
        .route("/api/health", get(health))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct FlowsParams {
    direction: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub total_flows: usize,
}

pub struct ApiError(FlowError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            FlowError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<FlowError> for ApiError {
    fn from(e: FlowError) -> Self {
        Self(e)
    }
}

async fn get_flows(
    State(state): State<AppState>,
    Path(area_code): Path<String>,
    Query(params): Query<FlowsParams>,
) -> Result<Response, ApiError> {
    let direction = parse_direction(params.direction.as_deref())?;
    let limit = parse_limit(params.limit.as_deref(), state.default_limit)?;

    tracing::info!("📊 Request: {}, direction: {}, limit: {}", area_code, direction, limit);

    // 線性掃描整個 store，移到 blocking pool 以免卡住 worker
    let store = Arc::clone(&state.store);
    let collection = tokio::task::spawn_blocking(move || {
        FlowQueryEngine::new(&store).query_geojson(&area_code, direction, limit)
    })
    .await
    .map_err(|e| FlowError::IoError(std::io::Error::other(e)))??;

    tracing::info!("✅ Found {} flows", collection.len());
    Ok(Json(collection).into_response())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        total_flows: state.store.len(),
    })
}
