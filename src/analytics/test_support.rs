// Fixture builders shared by the analytics unit tests

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::analytics::rules::ParticipationRule;
use crate::entities::{
    Event, EventStatus, Gender, Member, MemberStatus, Organization, OrganizationSettings,
    OrganizationType,
};

pub const ORG_ID: &str = "org-1";

fn noon(date: &str) -> DateTime<Utc> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
}

pub fn member(id: &str, name: &str) -> Member {
    let now = noon("2024-01-01");
    Member {
        id: id.to_string(),
        name: name.to_string(),
        gender: Gender::Female,
        birth_year: 1990,
        district: "Mapo".to_string(),
        organization_id: ORG_ID.to_string(),
        status: MemberStatus::Active,
        joined_at: now,
        created_at: now,
        updated_at: now,
    }
}

pub fn event_on(id: &str, date: &str, attendees: &[&str]) -> Event {
    let when = noon(date);
    let blank = Event {
        id: id.to_string(),
        organization_id: ORG_ID.to_string(),
        title: "Weekly meetup".to_string(),
        description: String::new(),
        date: when,
        location: "Community hall".to_string(),
        host_id: "host".to_string(),
        max_participants: None,
        current_participants: 0,
        status: EventStatus::Completed,
        attendees: Vec::new(),
        created_by: "system".to_string(),
        created_at: when,
        updated_at: when,
    };
    blank.with_attendees(attendees.iter().copied(), when).unwrap()
}

pub fn organization(rule: ParticipationRule) -> Organization {
    let now = noon("2024-01-01");
    Organization {
        id: ORG_ID.to_string(),
        name: "Hiking Club".to_string(),
        description: String::new(),
        org_type: OrganizationType::Club,
        location: None,
        max_members: 50,
        current_members: 0,
        settings: OrganizationSettings {
            participation_rule: rule,
        },
        created_by: "system".to_string(),
        created_at: now,
        updated_at: now,
    }
}
