use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{check_length, Entity};
use crate::infrastructure::store::Collection;

/// Append-only audit entry describing something that happened in an organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub action: String,
    #[serde(default)]
    pub details: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Entity for ActivityLog {
    const COLLECTION: Collection = Collection::ActivityLogs;
    const ENTITY_NAME: &'static str = "Activity log";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_length(&mut errors, "action", &self.action, 1, 100);
        check_length(&mut errors, "details", &self.details, 0, 1000);
        if self.organization_id.trim().is_empty() {
            errors.push("organizationId is required".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityLogRequest {
    pub organization_id: String,
    pub action: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActivityLogRequest {
    pub action: Option<String>,
    pub details: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}
