use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_length, check_range, Entity};
use crate::analytics::rules::ParticipationRule;
use crate::infrastructure::store::Collection;

pub const DEFAULT_MAX_MEMBERS: u32 = 50;
pub const MAX_MEMBERS_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationType {
    #[default]
    Club,
    Study,
    Culture,
    Sports,
    Volunteer,
    Business,
    Social,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSettings {
    #[serde(default)]
    pub participation_rule: ParticipationRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub org_type: OrganizationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub max_members: u32,
    /// Cached count of active members; only moved through the methods below
    pub current_members: u32,
    #[serde(default)]
    pub settings: OrganizationSettings,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn participation_rule(&self) -> ParticipationRule {
        self.settings.participation_rule
    }

    /// Overwrite the cached member count, clamped to `[0, max_members]`
    pub fn set_current_members(&mut self, count: u64) {
        self.current_members = count.min(self.max_members as u64) as u32;
    }

    pub fn increment_members(&mut self) {
        self.set_current_members(self.current_members as u64 + 1);
    }

    pub fn decrement_members(&mut self) {
        self.current_members = self.current_members.saturating_sub(1);
    }

    pub fn set_max_members(&mut self, max_members: u32) {
        self.max_members = max_members;
        self.set_current_members(self.current_members as u64);
    }
}

impl Entity for Organization {
    const COLLECTION: Collection = Collection::Organizations;
    const ENTITY_NAME: &'static str = "Organization";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_length(&mut errors, "name", &self.name, 2, 50);
        check_length(&mut errors, "description", &self.description, 0, 500);
        check_range(
            &mut errors,
            "maxMembers",
            self.max_members as i64,
            1,
            MAX_MEMBERS_LIMIT as i64,
        );
        if self.current_members > self.max_members {
            errors.push("currentMembers cannot exceed maxMembers".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub org_type: Option<OrganizationType>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub max_members: Option<u32>,
    #[serde(default)]
    pub settings: Option<OrganizationSettings>,
}

/// Whitelisted organization fields accepted on update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub org_type: Option<OrganizationType>,
    pub location: Option<String>,
    pub max_members: Option<u32>,
    pub settings: Option<OrganizationSettings>,
}
