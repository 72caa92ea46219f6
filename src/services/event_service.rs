// EventService - event writes and attendee mutations

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::entities::{
    AttendanceAction, AttendanceRequest, CreateEventRequest, Event, EventStatus, Member,
    Organization, UpdateEventRequest,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{
    DocumentStore, Filter, IdGenerator, Page, PageRequest, Repository, RequestContext,
};
use crate::services::ActivityLogService;

/// Optimistic retries for one attendance change before giving up
const ATTENDANCE_ATTEMPTS: usize = 8;

pub const EVENT_SORTS: &[&str] = &[
    "date",
    "createdAt",
    "title",
    "currentParticipants",
    "updatedAt",
];

#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub organization_id: Option<String>,
    pub status: Option<EventStatus>,
    pub search: Option<String>,
}

impl EventQuery {
    fn filter(&self) -> AppResult<Filter> {
        let mut filter = Filter::new();
        if let Some(organization_id) = &self.organization_id {
            filter = filter.eq("organizationId", organization_id.as_str());
        }
        if let Some(status) = self.status {
            let status = serde_json::to_value(status)?;
            filter = filter.eq("status", status.as_str().unwrap_or_default());
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            filter = filter.contains(&["title", "description", "location"], search.trim());
        }
        Ok(filter)
    }
}

/// `updatedAt` exactly as it is stored in the document
fn version_stamp(event: &Event) -> AppResult<String> {
    match serde_json::to_value(event.updated_at)? {
        Value::String(stamp) => Ok(stamp),
        other => Err(AppError::Internal(format!(
            "Unexpected updatedAt encoding: {}",
            other
        ))),
    }
}

#[derive(Clone)]
pub struct EventService {
    events: Repository<Event>,
    members: Repository<Member>,
    organizations: Repository<Organization>,
    activity: ActivityLogService,
    ids: Arc<IdGenerator>,
}

impl EventService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        ids: Arc<IdGenerator>,
        activity: ActivityLogService,
    ) -> Self {
        Self {
            events: Repository::new(store.clone()),
            members: Repository::new(store.clone()),
            organizations: Repository::new(store),
            activity,
            ids,
        }
    }

    pub async fn list(&self, query: &EventQuery, page: &PageRequest) -> AppResult<Page<Event>> {
        self.events.page(&query.filter()?, page).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<Event>> {
        self.events.find_all(&Filter::new()).await
    }

    pub async fn get(&self, id: &str) -> AppResult<Event> {
        self.events.get(id).await
    }

    /// Store `next` over `current` unless the event changed since `current`
    /// was read. `updatedAt` is the version stamp, so it always moves forward.
    async fn replace_if_unchanged(&self, current: &Event, next: &mut Event) -> AppResult<bool> {
        if next.updated_at <= current.updated_at {
            next.updated_at = current.updated_at + Duration::nanoseconds(1);
        }
        let unchanged = Filter::new().eq("updatedAt", version_stamp(current)?);
        self.events.update_if(next, &unchanged).await
    }

    async fn replace_or_conflict(&self, current: &Event, next: &mut Event) -> AppResult<()> {
        if self.replace_if_unchanged(current, next).await? {
            Ok(())
        } else {
            warn!(event_id = %current.id, "Rejected write over a concurrent event change");
            Err(AppError::Conflict(format!(
                "Event {} was modified concurrently, reload and try again",
                current.id
            )))
        }
    }

    /// Every id must name a member of the organization
    async fn ensure_members_of(&self, organization_id: &str, member_ids: &[String]) -> AppResult<()> {
        if member_ids.is_empty() {
            return Ok(());
        }
        let known: HashSet<String> = self
            .members
            .find_all(&Filter::new().eq("organizationId", organization_id))
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        let unknown: Vec<&str> = member_ids
            .iter()
            .filter(|id| !known.contains(id.as_str()))
            .map(String::as_str)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Not members of this organization: {}",
                unknown.join(", ")
            )))
        }
    }

    pub async fn create(&self, request: CreateEventRequest, ctx: &RequestContext) -> AppResult<Event> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let (Some(organization_id), Some(title), Some(date), Some(location), Some(host_id)) = (
            request.organization_id,
            request.title,
            request.date,
            request.location,
            request.host_id,
        ) else {
            return Err(AppError::Validation("Missing required fields".to_string()));
        };

        let organization = self.organizations.get(organization_id.trim()).await?;
        let host_id = host_id.trim().to_string();
        self.ensure_members_of(&organization.id, std::slice::from_ref(&host_id))
            .await?;
        self.ensure_members_of(&organization.id, &request.attendees)
            .await?;

        let now = Utc::now();
        let draft = Event {
            id: self.ids.next_id(),
            organization_id: organization.id.clone(),
            title: title.trim().to_string(),
            description: request.description.unwrap_or_default(),
            date,
            location: location.trim().to_string(),
            host_id,
            max_participants: request.max_participants,
            current_participants: 0,
            status: request.status.unwrap_or_default(),
            attendees: Vec::new(),
            created_by: ctx.actor.clone(),
            created_at: now,
            updated_at: now,
        };
        let event = draft.with_attendees(request.attendees, now)?;
        self.events.insert(&event).await?;

        info!(event_id = %event.id, organization_id = %event.organization_id, "Event created");
        self.activity
            .record(
                &event.organization_id,
                ctx,
                "event_created",
                format!("Event '{}' created", event.title),
                json!({ "eventId": event.id, "attendees": event.current_participants }),
            )
            .await;
        Ok(event)
    }

    pub async fn update(&self, id: &str, request: UpdateEventRequest) -> AppResult<Event> {
        let current = self.events.get(id).await?;
        let mut event = current.clone();

        if let Some(title) = request.title {
            event.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            event.description = description;
        }
        if let Some(date) = request.date {
            event.date = date;
        }
        if let Some(location) = request.location {
            event.location = location.trim().to_string();
        }
        if let Some(host_id) = request.host_id {
            let host_id = host_id.trim().to_string();
            self.ensure_members_of(&event.organization_id, std::slice::from_ref(&host_id))
                .await?;
            event.host_id = host_id;
        }
        if request.max_participants.is_some() {
            event.set_max_participants(request.max_participants)?;
        }
        event.updated_at = Utc::now();
        self.replace_or_conflict(&current, &mut event).await?;

        info!(event_id = %id, "Event updated");
        Ok(event)
    }

    pub async fn change_status(&self, id: &str, status: EventStatus) -> AppResult<Event> {
        let current = self.events.get(id).await?;
        let mut event = current.clone();
        event.status = status;
        event.updated_at = Utc::now();
        self.replace_or_conflict(&current, &mut event).await?;

        info!(event_id = %id, ?status, "Event status changed");
        Ok(event)
    }

    /// Add or remove one attendee. The stored event is only replaced once the
    /// changed copy has passed the capacity check, and only if nobody else
    /// changed the event since it was read; otherwise the change is retried
    /// against the fresh copy.
    pub async fn update_attendance(
        &self,
        id: &str,
        request: AttendanceRequest,
        ctx: &RequestContext,
    ) -> AppResult<Event> {
        let member_id = request.member_id.trim();
        let mut event = self.events.get(id).await?;

        if request.action == AttendanceAction::Add {
            let member = self.members.get(member_id).await?;
            if member.organization_id != event.organization_id {
                return Err(AppError::Validation(format!(
                    "Member {} does not belong to the event's organization",
                    member_id
                )));
            }
        }

        for attempt in 1..=ATTENDANCE_ATTEMPTS {
            let mut updated =
                match event.with_attendance_change(member_id, request.action, Utc::now()) {
                    Ok(updated) => updated,
                    Err(e) => {
                        warn!(event_id = %id, member_id, error = %e, "Attendance change rejected");
                        return Err(e);
                    }
                };

            if self.replace_if_unchanged(&event, &mut updated).await? {
                info!(
                    event_id = %id,
                    member_id,
                    action = ?request.action,
                    participants = updated.current_participants,
                    "Attendance updated"
                );
                self.activity
                    .record(
                        &updated.organization_id,
                        ctx,
                        "attendance_updated",
                        format!("Attendance for '{}' updated", updated.title),
                        json!({ "eventId": updated.id, "memberId": member_id, "action": request.action }),
                    )
                    .await;
                return Ok(updated);
            }

            debug!(event_id = %id, attempt, "Event changed concurrently, retrying attendance change");
            event = self.events.get(id).await?;
        }

        warn!(event_id = %id, member_id, "Attendance change kept losing to concurrent writes");
        Err(AppError::Conflict(format!(
            "Event {} is being modified concurrently, try again",
            id
        )))
    }

    pub async fn delete(&self, id: &str, ctx: &RequestContext) -> AppResult<()> {
        let event = self.events.get(id).await?;
        self.events.delete(id).await?;

        info!(event_id = %id, "Event deleted");
        self.activity
            .record(
                &event.organization_id,
                ctx,
                "event_deleted",
                format!("Event '{}' deleted", event.title),
                json!({ "eventId": event.id }),
            )
            .await;
        Ok(())
    }
}
