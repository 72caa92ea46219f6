use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};

use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::params::ListParams;
use crate::api::response::ApiResponse;
use crate::app_state::AppState;
use crate::entities::{CreateOrganizationRequest, Organization, UpdateOrganizationRequest};
use crate::error::AppResult;
use crate::infrastructure::RequestContext;
use crate::services::{OrganizationDeletion, OrganizationQuery, ORGANIZATION_SORTS};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_organizations).post(create_organization))
        .route(
            "/{id}",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
        .route("/{id}/sync-members", post(sync_members))
}

pub async fn list_organizations(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<ApiResponse<Vec<Organization>>> {
    let page = params.page_request(ORGANIZATION_SORTS)?;
    let query = OrganizationQuery {
        org_type: params.org_type()?,
        search: params.search(),
    };
    let page = state.organizations.list(&query, &page).await?;
    Ok(ApiResponse::paginated(page))
}

pub async fn get_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Organization>> {
    Ok(ApiResponse::ok(state.organizations.get(&id).await?))
}

pub async fn create_organization(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(request): ApiJson<CreateOrganizationRequest>,
) -> AppResult<ApiResponse<Organization>> {
    let organization = state.organizations.create(request, &ctx).await?;
    Ok(ApiResponse::created(organization).with_message("Organization created"))
}

pub async fn update_organization(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateOrganizationRequest>,
) -> AppResult<ApiResponse<Organization>> {
    let organization = state.organizations.update(&id, request, &ctx).await?;
    Ok(ApiResponse::ok(organization).with_message("Organization updated"))
}

pub async fn delete_organization(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<OrganizationDeletion>> {
    let deletion = state.organizations.delete(&id, &ctx).await?;
    let message = format!(
        "Organization deleted along with {} members",
        deletion.deleted_members
    );
    Ok(ApiResponse::ok(deletion).with_message(message))
}

pub async fn sync_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Organization>> {
    let organization = state.organizations.sync_members(&id).await?;
    Ok(ApiResponse::ok(organization).with_message("Member count synchronized"))
}
