use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Router,
};

use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::params::{ListParams, StatusChange};
use crate::api::response::ApiResponse;
use crate::app_state::AppState;
use crate::entities::{
    AttendanceRequest, CreateEventRequest, Event, EventStatus, UpdateEventRequest,
};
use crate::error::AppResult;
use crate::infrastructure::RequestContext;
use crate::services::{EventQuery, EVENT_SORTS};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/{id}", get(get_event).put(update_event).delete(delete_event))
        .route("/{id}/attendance", post(update_attendance))
        .route("/{id}/status", patch(change_event_status))
}

pub async fn list_events(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<ApiResponse<Vec<Event>>> {
    let page = params.page_request(EVENT_SORTS)?;
    let query = EventQuery {
        organization_id: params.organization_id(),
        status: params.status()?,
        search: params.search(),
    };
    Ok(ApiResponse::paginated(state.events.list(&query, &page).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Event>> {
    Ok(ApiResponse::ok(state.events.get(&id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(request): ApiJson<CreateEventRequest>,
) -> AppResult<ApiResponse<Event>> {
    let event = state.events.create(request, &ctx).await?;
    Ok(ApiResponse::created(event).with_message("Event created"))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateEventRequest>,
) -> AppResult<ApiResponse<Event>> {
    let event = state.events.update(&id, request).await?;
    Ok(ApiResponse::ok(event).with_message("Event updated"))
}

pub async fn update_attendance(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<AttendanceRequest>,
) -> AppResult<ApiResponse<Event>> {
    let event = state.events.update_attendance(&id, request, &ctx).await?;
    Ok(ApiResponse::ok(event).with_message("Attendance updated"))
}

pub async fn change_event_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<StatusChange<EventStatus>>,
) -> AppResult<ApiResponse<Event>> {
    let event = state.events.change_status(&id, change.status).await?;
    Ok(ApiResponse::ok(event).with_message("Event status updated"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.events.delete(&id, &ctx).await?;
    Ok(ApiResponse::message("Event deleted"))
}
