use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};

use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::params::ListParams;
use crate::api::response::ApiResponse;
use crate::app_state::AppState;
use crate::entities::{ActivityLog, CreateActivityLogRequest, UpdateActivityLogRequest};
use crate::error::AppResult;
use crate::infrastructure::RequestContext;
use crate::services::{ActivityLogQuery, ACTIVITY_LOG_SORTS};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_activity_logs).post(create_activity_log))
        .route(
            "/{id}",
            get(get_activity_log)
                .put(update_activity_log)
                .delete(delete_activity_log),
        )
}

pub async fn list_activity_logs(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<ApiResponse<Vec<ActivityLog>>> {
    let page = params.page_request(ACTIVITY_LOG_SORTS)?;
    let query = ActivityLogQuery {
        organization_id: params.organization_id(),
        search: params.search(),
    };
    Ok(ApiResponse::paginated(
        state.activity_logs.list(&query, &page).await?,
    ))
}

pub async fn get_activity_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ActivityLog>> {
    Ok(ApiResponse::ok(state.activity_logs.get(&id).await?))
}

pub async fn create_activity_log(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(request): ApiJson<CreateActivityLogRequest>,
) -> AppResult<ApiResponse<ActivityLog>> {
    let log = state.activity_logs.create(request, &ctx).await?;
    Ok(ApiResponse::created(log))
}

pub async fn update_activity_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateActivityLogRequest>,
) -> AppResult<ApiResponse<ActivityLog>> {
    Ok(ApiResponse::ok(state.activity_logs.update(&id, request).await?))
}

pub async fn delete_activity_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.activity_logs.delete(&id).await?;
    Ok(ApiResponse::message("Activity log deleted"))
}
