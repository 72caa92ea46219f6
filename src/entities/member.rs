use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{check_length, check_range, Entity};
use crate::infrastructure::store::Collection;

pub const MIN_BIRTH_YEAR: i32 = 1950;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub birth_year: i32,
    #[serde(default)]
    pub district: String,
    pub organization_id: String,
    #[serde(default)]
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

impl Entity for Member {
    const COLLECTION: Collection = Collection::Members;
    const ENTITY_NAME: &'static str = "Member";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_length(&mut errors, "name", &self.name, 2, 20);
        check_length(&mut errors, "district", &self.district, 0, 50);
        check_range(
            &mut errors,
            "birthYear",
            self.birth_year as i64,
            MIN_BIRTH_YEAR as i64,
            Utc::now().year() as i64,
        );
        if self.organization_id.trim().is_empty() {
            errors.push("organizationId is required".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub name: String,
    pub gender: Gender,
    pub birth_year: i32,
    #[serde(default)]
    pub district: Option<String>,
    pub organization_id: String,
    #[serde(default)]
    pub status: Option<MemberStatus>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_year: Option<i32>,
    pub district: Option<String>,
    pub organization_id: Option<String>,
}
