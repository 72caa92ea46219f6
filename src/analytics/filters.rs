// Query/Filter layer - in-memory narrowing of loaded collections

use crate::analytics::rules::DateRange;
use crate::entities::{Event, Member, Organization};

/// Events whose date falls inside the range; everything when no range is given
pub fn events_in_range(events: &[Event], range: Option<&DateRange>) -> Vec<Event> {
    match range {
        Some(range) => events
            .iter()
            .filter(|e| range.contains(e.date))
            .cloned()
            .collect(),
        None => events.to_vec(),
    }
}

pub fn events_of_organization(events: &[Event], organization_id: &str) -> Vec<Event> {
    events
        .iter()
        .filter(|e| e.organization_id == organization_id)
        .cloned()
        .collect()
}

pub fn active_members_of(members: &[Member], organization_id: &str) -> Vec<Member> {
    members
        .iter()
        .filter(|m| m.organization_id == organization_id && m.is_active())
        .cloned()
        .collect()
}

/// Case-insensitive substring match against any haystack; a blank needle matches
pub fn matches_search(needle: &str, haystacks: &[&str]) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}

pub fn search_organizations(organizations: &[Organization], needle: &str) -> Vec<Organization> {
    organizations
        .iter()
        .filter(|o| {
            matches_search(
                needle,
                &[
                    o.name.as_str(),
                    o.description.as_str(),
                    o.location.as_deref().unwrap_or_default(),
                ],
            )
        })
        .cloned()
        .collect()
}

pub fn search_members(members: &[Member], needle: &str) -> Vec<Member> {
    members
        .iter()
        .filter(|m| matches_search(needle, &[m.name.as_str(), m.district.as_str()]))
        .cloned()
        .collect()
}

pub fn search_events(events: &[Event], needle: &str) -> Vec<Event> {
    events
        .iter()
        .filter(|e| {
            matches_search(
                needle,
                &[e.title.as_str(), e.description.as_str(), e.location.as_str()],
            )
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{event_on, member};
    use chrono::NaiveDate;

    #[test]
    fn test_events_in_range_is_inclusive() {
        let events = vec![
            event_on("e1", "2024-01-01", &[]),
            event_on("e2", "2024-01-31", &[]),
            event_on("e3", "2024-02-01", &[]),
        ];
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();

        let ids: Vec<String> = events_in_range(&events, Some(&range))
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["e1", "e2"]);
        assert_eq!(events_in_range(&events, None).len(), 3);
    }

    #[test]
    fn test_active_members_of() {
        let mut inactive = member("m2", "Lee");
        inactive.status = crate::entities::MemberStatus::Inactive;
        let mut elsewhere = member("m3", "Park");
        elsewhere.organization_id = "other".to_string();

        let members = vec![member("m1", "Kim"), inactive, elsewhere];
        let active = active_members_of(&members, "org-1");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "m1");
    }

    #[test]
    fn test_search() {
        assert!(matches_search("", &["anything"]));
        assert!(matches_search("  KIM ", &["Lee", "kim min-su"]));
        assert!(!matches_search("park", &["Lee", "Kim"]));

        let members = vec![member("m1", "Kim"), member("m2", "Lee")];
        let found = search_members(&members, "le");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Lee");

        let events = vec![event_on("e1", "2024-01-01", &[])];
        assert_eq!(search_events(&events, "meet").len(), 1);
        assert!(search_events(&events, "party").is_empty());
    }
}
