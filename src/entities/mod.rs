// Domain entities - plain records persisted as documents, each carrying its
// own field validation

pub mod activity_log;
pub mod event;
pub mod member;
pub mod organization;

pub use activity_log::{ActivityLog, CreateActivityLogRequest, UpdateActivityLogRequest};
pub use event::{
    AttendanceAction, AttendanceRequest, Attendee, AttendeeStatus, CreateEventRequest, Event,
    EventStatus, UpdateEventRequest,
};
pub use member::{CreateMemberRequest, Gender, Member, MemberStatus, UpdateMemberRequest};
pub use organization::{
    CreateOrganizationRequest, Organization, OrganizationSettings, OrganizationType,
    UpdateOrganizationRequest,
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::Collection;

/// Implemented by every record type that lives in the document store
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the entity is stored in
    const COLLECTION: Collection;

    /// Human-readable name used in error messages
    const ENTITY_NAME: &'static str;

    fn id(&self) -> &str;

    /// Field-level constraint violations, empty when the entity is valid
    fn validate(&self) -> Vec<String>;

    fn ensure_valid(&self) -> AppResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "{} validation failed: {}",
                Self::ENTITY_NAME,
                errors.join(", ")
            )))
        }
    }
}

/// Character-length check on the trimmed value
pub(crate) fn check_length(
    errors: &mut Vec<String>,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.trim().chars().count();
    if len < min || len > max {
        if min == 0 {
            errors.push(format!("{} must be at most {} characters", field, max));
        } else {
            errors.push(format!(
                "{} must be between {} and {} characters",
                field, min, max
            ));
        }
    }
}

pub(crate) fn check_range(errors: &mut Vec<String>, field: &str, value: i64, min: i64, max: i64) {
    if value < min || value > max {
        errors.push(format!("{} must be between {} and {}", field, min, max));
    }
}

/// Parse a lowercase enum value (as it appears in JSON) from a query string
pub fn parse_enum<T: DeserializeOwned>(field: &str, raw: &str) -> AppResult<T> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|_| AppError::Validation(format!("Unknown {} '{}'", field, raw)))
}
