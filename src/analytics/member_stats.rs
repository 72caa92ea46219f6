// Per-member attendance statistics and risk classification

use serde::Serialize;
use std::cmp::Ordering;

use crate::entities::{Event, Gender, Member};

/// Where a member stands against the required attendance for the period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RiskLevel {
    /// Attended fewer events than required
    AtRisk,
    /// Attended exactly the required number
    Adequate,
    /// Attended more than required
    Excellent,
    /// No requirement applies (unlimited rule)
    Normal,
}

impl RiskLevel {
    pub fn classify(attended: u32, required: u32) -> Self {
        if required == 0 {
            return RiskLevel::Normal;
        }
        match attended.cmp(&required) {
            Ordering::Less => RiskLevel::AtRisk,
            Ordering::Equal => RiskLevel::Adequate,
            Ordering::Greater => RiskLevel::Excellent,
        }
    }

    /// Badge text shown on the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::AtRisk => "위험",
            RiskLevel::Adequate => "양호",
            RiskLevel::Excellent => "우수",
            RiskLevel::Normal => "정상",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    pub member_id: String,
    pub name: String,
    pub gender: Gender,
    pub birth_year: i32,
    pub district: String,
    pub attended_events: u32,
    pub total_events: u32,
    pub attendance_rate: f64,
    pub required_attendance: u32,
    pub deficit: u32,
    pub risk_level: RiskLevel,
    pub risk_label: &'static str,
}

/// Percentage in `[0, 100]`; zero when there is nothing to attend
pub fn attendance_rate(attended: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        attended as f64 / total as f64 * 100.0
    }
}

pub fn member_stats(member: &Member, events: &[Event], required_attendance: u32) -> MemberStats {
    let attended = events.iter().filter(|e| e.has_attendee(&member.id)).count() as u32;
    let total = events.len() as u32;
    let risk_level = RiskLevel::classify(attended, required_attendance);

    MemberStats {
        member_id: member.id.clone(),
        name: member.name.clone(),
        gender: member.gender,
        birth_year: member.birth_year,
        district: member.district.clone(),
        attended_events: attended,
        total_events: total,
        attendance_rate: attendance_rate(attended as usize, total as usize),
        required_attendance,
        deficit: required_attendance.saturating_sub(attended),
        risk_level,
        risk_label: risk_level.label(),
    }
}

/// One record per member, in input order. `events` must already be narrowed
/// to the organization and reporting range.
pub fn compute_member_stats(
    members: &[Member],
    events: &[Event],
    required_attendance: u32,
) -> Vec<MemberStats> {
    members
        .iter()
        .map(|m| member_stats(m, events, required_attendance))
        .collect()
}

/// Highest attendance rate first; equal rates keep their relative order
pub fn sort_by_attendance_rate(stats: &mut [MemberStats]) {
    stats.sort_by(|a, b| {
        b.attendance_rate
            .partial_cmp(&a.attendance_rate)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::rules::{required_attendance, DateRange, ParticipationRule};
    use crate::analytics::test_support::{event_on, member};
    use chrono::NaiveDate;

    #[test]
    fn test_scenario_rule_two_over_two_months() {
        let events = vec![
            event_on("e1", "2024-03-05", &["m"]),
            event_on("e2", "2024-03-19", &[]),
            event_on("e3", "2024-04-02", &["m"]),
        ];
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
        )
        .unwrap();
        let required = required_attendance(ParticipationRule::PerMonth(2), Some(&range));
        assert_eq!(required, 4);

        let stats = member_stats(&member("m", "Kim"), &events, required);
        assert_eq!(stats.attended_events, 2);
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.risk_level, RiskLevel::AtRisk);
        assert_eq!(stats.risk_label, "위험");
        assert_eq!(stats.deficit, 2);
        assert!((stats.attendance_rate - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_no_events_means_zero_rate() {
        let stats = member_stats(&member("m", "Kim"), &[], 3);
        assert_eq!(stats.attendance_rate, 0.0);
        assert_eq!(stats.total_events, 0);
        assert_eq!(stats.deficit, 3);
    }

    #[test]
    fn test_classification_is_a_step_function() {
        for required in 1..6u32 {
            for attended in 0..10u32 {
                let level = RiskLevel::classify(attended, required);
                let expected = if attended < required {
                    RiskLevel::AtRisk
                } else if attended == required {
                    RiskLevel::Adequate
                } else {
                    RiskLevel::Excellent
                };
                assert_eq!(level, expected);
            }
        }
        for attended in 0..10u32 {
            assert_eq!(RiskLevel::classify(attended, 0), RiskLevel::Normal);
        }
    }

    #[test]
    fn test_rate_is_bounded() {
        let events: Vec<Event> = (0..7)
            .map(|i| {
                let attendees: &[&str] = if i % 2 == 0 { &["m"] } else { &[] };
                event_on(&format!("e{}", i), "2024-01-10", attendees)
            })
            .collect();
        for n in 0..=events.len() {
            let stats = member_stats(&member("m", "Kim"), &events[..n], 0);
            assert!((0.0..=100.0).contains(&stats.attendance_rate));
        }
    }

    #[test]
    fn test_sort_is_stable_and_descending() {
        let events = vec![
            event_on("e1", "2024-01-01", &["b", "c"]),
            event_on("e2", "2024-01-08", &["a", "b"]),
        ];
        let members = vec![member("a", "Ahn"), member("b", "Baek"), member("c", "Cho")];
        let mut stats = compute_member_stats(&members, &events, 0);
        sort_by_attendance_rate(&mut stats);

        let order: Vec<&str> = stats.iter().map(|s| s.member_id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }
}
