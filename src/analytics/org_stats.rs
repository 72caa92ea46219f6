// Organization-level and system-wide attendance aggregates

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::analytics::filters::{
    active_members_of, events_in_range, events_of_organization, matches_search,
};
use crate::analytics::member_stats::{
    compute_member_stats, member_stats, sort_by_attendance_rate, MemberStats, RiskLevel,
};
use crate::analytics::rules::{required_attendance, DateRange, ParticipationRule};
use crate::analytics::streaks::{attendance_history, chronological, month_key, AttendanceHistory};
use crate::entities::{Event, EventStatus, Member, Organization};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_members: u32,
    pub total_events: u32,
    pub average_attendance_rate: f64,
    pub risk_member_count: u32,
    /// Members who attended at least one event
    pub active_members: u32,
}

pub fn overall_stats(stats: &[MemberStats], total_events: usize) -> OverallStats {
    let average_attendance_rate = if stats.is_empty() {
        0.0
    } else {
        stats.iter().map(|s| s.attendance_rate).sum::<f64>() / stats.len() as f64
    };

    OverallStats {
        total_members: stats.len() as u32,
        total_events: total_events as u32,
        average_attendance_rate,
        risk_member_count: stats
            .iter()
            .filter(|s| s.risk_level == RiskLevel::AtRisk)
            .count() as u32,
        active_members: stats.iter().filter(|s| s.attended_events > 0).count() as u32,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStats {
    pub month: String,
    pub total_events: u32,
    pub total_attendees: u32,
    pub average_attendance: f64,
    pub unique_participants: u32,
}

/// One bucket per "YYYY-MM" that has at least one event, oldest first
pub fn monthly_stats(events: &[Event]) -> Vec<MonthlyStats> {
    let mut buckets: BTreeMap<String, Vec<&Event>> = BTreeMap::new();
    for event in events {
        buckets.entry(month_key(event.date)).or_default().push(event);
    }

    buckets
        .into_iter()
        .map(|(month, events)| {
            let total_attendees: usize = events.iter().map(|e| e.attendee_count()).sum();
            let unique: HashSet<&str> = events.iter().flat_map(|e| e.attendee_ids()).collect();
            MonthlyStats {
                month,
                total_events: events.len() as u32,
                total_attendees: total_attendees as u32,
                average_attendance: total_attendees as f64 / events.len() as f64,
                unique_participants: unique.len() as u32,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub event_id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub status: EventStatus,
    pub attendee_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    /// Fill rate against `max_participants`; zero when uncapped
    pub attendance_rate: f64,
}

pub fn event_stats(events: &[Event]) -> Vec<EventStats> {
    chronological(events)
        .into_iter()
        .map(|event| {
            let attendee_count = event.attendee_count() as u32;
            let attendance_rate = match event.max_participants {
                Some(max) if max > 0 => attendee_count as f64 / max as f64 * 100.0,
                _ => 0.0,
            };
            EventStats {
                event_id: event.id.clone(),
                title: event.title.clone(),
                date: event.date,
                location: event.location.clone(),
                status: event.status,
                attendee_count,
                max_participants: event.max_participants,
                attendance_rate,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationReport {
    pub organization_id: String,
    pub organization_name: String,
    pub participation_rule: ParticipationRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<DateRange>,
    pub required_attendance: u32,
    pub overall_stats: OverallStats,
    /// Sorted by attendance rate, narrowed by the name search when given
    pub member_stats: Vec<MemberStats>,
    pub monthly_stats: Vec<MonthlyStats>,
    pub event_stats: Vec<EventStats>,
}

/// Full report for one organization. `members` and `events` may span the
/// whole store; they are narrowed to the organization's active members and
/// to the events inside `range` here.
pub fn organization_report(
    organization: &Organization,
    members: &[Member],
    events: &[Event],
    range: Option<&DateRange>,
    search: Option<&str>,
) -> OrganizationReport {
    let members = active_members_of(members, &organization.id);
    let events = events_in_range(&events_of_organization(events, &organization.id), range);
    let rule = organization.participation_rule();
    let required = required_attendance(rule, range);

    let mut stats = compute_member_stats(&members, &events, required);
    let overall = overall_stats(&stats, events.len());

    if let Some(needle) = search {
        stats.retain(|s| matches_search(needle, &[s.name.as_str()]));
    }
    sort_by_attendance_rate(&mut stats);

    OrganizationReport {
        organization_id: organization.id.clone(),
        organization_name: organization.name.clone(),
        participation_rule: rule,
        range: range.copied(),
        required_attendance: required,
        overall_stats: overall,
        member_stats: stats,
        monthly_stats: monthly_stats(&events),
        event_stats: event_stats(&events),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberReport {
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<DateRange>,
    pub stats: MemberStats,
    pub history: AttendanceHistory,
}

/// Statistics plus streaks and recent history for one member of an organization
pub fn member_report(
    organization: &Organization,
    member: &Member,
    events: &[Event],
    range: Option<&DateRange>,
) -> MemberReport {
    let events = events_in_range(&events_of_organization(events, &organization.id), range);
    let required = required_attendance(organization.participation_rule(), range);

    MemberReport {
        organization_id: organization.id.clone(),
        range: range.copied(),
        stats: member_stats(member, &events, required),
        history: attendance_history(&member.id, &events),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub organization_id: String,
    pub name: String,
    pub participation_rule: ParticipationRule,
    pub required_attendance: u32,
    pub total_attendances: u32,
    #[serde(flatten)]
    pub stats: OverallStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemTotals {
    pub organizations: u32,
    pub total_members: u32,
    pub total_events: u32,
    pub total_attendances: u32,
    pub risk_member_count: u32,
    pub active_members: u32,
    /// Mean of the per-organization averages, zero without organizations
    pub average_attendance_rate: f64,
    pub unique_participants: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<DateRange>,
    pub totals: SystemTotals,
    pub organizations: Vec<OrganizationSummary>,
    pub monthly_stats: Vec<MonthlyStats>,
}

pub fn system_report(
    organizations: &[Organization],
    members: &[Member],
    events: &[Event],
    range: Option<&DateRange>,
) -> SystemReport {
    let mut summaries = Vec::with_capacity(organizations.len());
    let mut scoped_events: Vec<Event> = Vec::new();

    for organization in organizations {
        let report = organization_report(organization, members, events, range, None);
        let org_events = events_in_range(&events_of_organization(events, &organization.id), range);
        let total_attendances: usize = org_events.iter().map(Event::attendee_count).sum();
        scoped_events.extend(org_events);

        summaries.push(OrganizationSummary {
            organization_id: report.organization_id,
            name: report.organization_name,
            participation_rule: report.participation_rule,
            required_attendance: report.required_attendance,
            total_attendances: total_attendances as u32,
            stats: report.overall_stats,
        });
    }

    let unique: HashSet<&str> = scoped_events.iter().flat_map(|e| e.attendee_ids()).collect();
    let totals = SystemTotals {
        organizations: summaries.len() as u32,
        total_members: summaries.iter().map(|s| s.stats.total_members).sum(),
        total_events: summaries.iter().map(|s| s.stats.total_events).sum(),
        total_attendances: summaries.iter().map(|s| s.total_attendances).sum(),
        risk_member_count: summaries.iter().map(|s| s.stats.risk_member_count).sum(),
        active_members: summaries.iter().map(|s| s.stats.active_members).sum(),
        average_attendance_rate: if summaries.is_empty() {
            0.0
        } else {
            summaries
                .iter()
                .map(|s| s.stats.average_attendance_rate)
                .sum::<f64>()
                / summaries.len() as f64
        },
        unique_participants: unique.len() as u32,
    };

    SystemReport {
        range: range.copied(),
        totals,
        organizations: summaries,
        monthly_stats: monthly_stats(&scoped_events),
    }
}
