use axum::extract::State;
use chrono::Utc;
use serde_json::{json, Value};

use crate::api::extract::ApiQuery;
use crate::api::params::SearchParams;
use crate::api::response::ApiResponse;
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::services::Dashboard;

pub async fn dashboard(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> AppResult<ApiResponse<Dashboard>> {
    Ok(ApiResponse::ok(state.dashboard.load(params.search()).await?))
}

pub async fn health(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::ok(json!({
        "status": "ok",
        "backend": state.store.backend(),
        "environment": state.config.app.environment,
        "timestamp": Utc::now(),
    }))
    .with_message("Service is healthy")
}
