use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_length, check_range, Entity};
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::Collection;

pub const MAX_PARTICIPANTS_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    #[default]
    Published,
    Ongoing,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeStatus {
    Registered,
    #[default]
    Attended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub member_id: String,
    #[serde(default)]
    pub status: AttendeeStatus,
    pub joined_at: DateTime<Utc>,
}

impl Attendee {
    pub fn new(member_id: impl Into<String>, joined_at: DateTime<Utc>) -> Self {
        Self {
            member_id: member_id.into(),
            status: AttendeeStatus::Attended,
            joined_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub host_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    /// Always equal to `attendees.len()`
    pub current_participants: u32,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceAction {
    Add,
    Remove,
}

impl Event {
    pub fn has_attendee(&self, member_id: &str) -> bool {
        self.attendees.iter().any(|a| a.member_id == member_id)
    }

    pub fn attendee_count(&self) -> usize {
        self.attendees.len()
    }

    pub fn attendee_ids(&self) -> impl Iterator<Item = &str> {
        self.attendees.iter().map(|a| a.member_id.as_str())
    }

    pub(crate) fn sync_participants(&mut self) {
        self.current_participants = self.attendees.len() as u32;
    }

    fn ensure_capacity(&self) -> AppResult<()> {
        match self.max_participants {
            Some(max) if self.attendees.len() > max as usize => Err(AppError::Capacity(format!(
                "Event '{}' allows at most {} participants",
                self.title, max
            ))),
            _ => Ok(()),
        }
    }

    /// Replace the attendee list with the given member ids, dropping
    /// duplicates while keeping first-seen order.
    pub fn with_attendees<I, S>(&self, member_ids: I, now: DateTime<Utc>) -> AppResult<Event>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.attendees.clear();
        for member_id in member_ids {
            let member_id = member_id.into();
            if !next.has_attendee(&member_id) {
                next.attendees.push(Attendee::new(member_id, now));
            }
        }
        next.ensure_capacity()?;
        next.sync_participants();
        Ok(next)
    }

    /// Apply an add/remove to a copy of the event. `add` is set-like; the
    /// copy is rejected whole when it would exceed `max_participants`, so
    /// `self` is never touched.
    pub fn with_attendance_change(
        &self,
        member_id: &str,
        action: AttendanceAction,
        now: DateTime<Utc>,
    ) -> AppResult<Event> {
        let mut next = self.clone();
        match action {
            AttendanceAction::Add => {
                if !next.has_attendee(member_id) {
                    next.attendees.push(Attendee::new(member_id, now));
                }
            }
            AttendanceAction::Remove => next.attendees.retain(|a| a.member_id != member_id),
        }
        next.ensure_capacity()?;
        next.sync_participants();
        next.updated_at = now;
        Ok(next)
    }

    /// Change the participant cap; lowering it below the current attendee
    /// count is a capacity error.
    pub fn set_max_participants(&mut self, max: Option<u32>) -> AppResult<()> {
        let previous = self.max_participants;
        self.max_participants = max;
        if let Err(e) = self.ensure_capacity() {
            self.max_participants = previous;
            return Err(e);
        }
        Ok(())
    }
}

impl Entity for Event {
    const COLLECTION: Collection = Collection::Events;
    const ENTITY_NAME: &'static str = "Event";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_length(&mut errors, "title", &self.title, 2, 100);
        check_length(&mut errors, "description", &self.description, 0, 1000);
        check_length(&mut errors, "location", &self.location, 2, 200);
        if let Some(max) = self.max_participants {
            check_range(
                &mut errors,
                "maxParticipants",
                max as i64,
                1,
                MAX_PARTICIPANTS_LIMIT as i64,
            );
        }
        if self.current_participants as usize != self.attendees.len() {
            errors.push("currentParticipants must equal the number of attendees".to_string());
        }
        errors
    }
}

/// Create payload; required fields are optional here so that missing ones
/// are reported together as a validation error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub organization_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub host_id: Option<String>,
    pub max_participants: Option<u32>,
    pub status: Option<EventStatus>,
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl CreateEventRequest {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map(str::trim).map_or(true, str::is_empty)
        }

        let mut missing = Vec::new();
        if blank(&self.organization_id) {
            missing.push("organizationId");
        }
        if blank(&self.title) {
            missing.push("title");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        if blank(&self.location) {
            missing.push("location");
        }
        if blank(&self.host_id) {
            missing.push("hostId");
        }
        missing
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub host_id: Option<String>,
    pub max_participants: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub member_id: String,
    pub action: AttendanceAction,
}
