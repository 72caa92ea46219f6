use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};

use crate::analytics::{MemberReport, OrganizationReport, SystemReport};
use crate::api::extract::ApiQuery;
use crate::api::params::AnalyticsParams;
use crate::api::response::ApiResponse;
use crate::app_state::AppState;
use crate::error::AppResult;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/organizations/{id}", get(organization_analytics))
        .route(
            "/organizations/{id}/members/{member_id}",
            get(member_analytics),
        )
        .route("/system", get(system_analytics))
}

pub async fn organization_analytics(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<AnalyticsParams>,
) -> AppResult<ApiResponse<OrganizationReport>> {
    let range = params.range()?;
    let report = state
        .analytics
        .organization_report(&id, range, params.search())
        .await?;
    Ok(ApiResponse::ok(report))
}

pub async fn member_analytics(
    State(state): State<AppState>,
    Path((id, member_id)): Path<(String, String)>,
    ApiQuery(params): ApiQuery<AnalyticsParams>,
) -> AppResult<ApiResponse<MemberReport>> {
    let range = params.range()?;
    let report = state.analytics.member_report(&id, &member_id, range).await?;
    Ok(ApiResponse::ok(report))
}

pub async fn system_analytics(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<AnalyticsParams>,
) -> AppResult<ApiResponse<SystemReport>> {
    let range = params.range()?;
    Ok(ApiResponse::ok(state.analytics.system_report(range).await?))
}
