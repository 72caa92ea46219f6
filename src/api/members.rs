use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Router,
};

use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::params::{ListParams, StatusChange};
use crate::api::response::ApiResponse;
use crate::app_state::AppState;
use crate::entities::{CreateMemberRequest, Member, MemberStatus, UpdateMemberRequest};
use crate::error::AppResult;
use crate::infrastructure::RequestContext;
use crate::services::{MemberQuery, MEMBER_SORTS};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_members).post(create_member))
        .route(
            "/{id}",
            get(get_member).put(update_member).delete(delete_member),
        )
        .route("/{id}/status", patch(change_member_status))
}

pub async fn list_members(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<ApiResponse<Vec<Member>>> {
    let page = params.page_request(MEMBER_SORTS)?;
    let query = MemberQuery {
        organization_id: params.organization_id(),
        status: params.status()?,
        search: params.search(),
    };
    Ok(ApiResponse::paginated(state.members.list(&query, &page).await?))
}

pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Member>> {
    Ok(ApiResponse::ok(state.members.get(&id).await?))
}

pub async fn create_member(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(request): ApiJson<CreateMemberRequest>,
) -> AppResult<ApiResponse<Member>> {
    let member = state.members.create(request, &ctx).await?;
    Ok(ApiResponse::created(member).with_message("Member created"))
}

pub async fn update_member(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateMemberRequest>,
) -> AppResult<ApiResponse<Member>> {
    let member = state.members.update(&id, request, &ctx).await?;
    Ok(ApiResponse::ok(member).with_message("Member updated"))
}

pub async fn change_member_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<StatusChange<MemberStatus>>,
) -> AppResult<ApiResponse<Member>> {
    let member = state.members.change_status(&id, change.status, &ctx).await?;
    Ok(ApiResponse::ok(member).with_message("Member status updated"))
}

pub async fn delete_member(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.members.delete(&id, &ctx).await?;
    Ok(ApiResponse::message("Member deleted"))
}
