// Streak detection and attendance history for a single member

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::analytics::member_stats::attendance_rate;
use crate::entities::Event;

pub const RECENT_EVENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    pub current_streak: u32,
    pub max_streak: u32,
    pub current_miss_streak: u32,
    pub max_miss_streak: u32,
    pub total_events: u32,
    pub attended_events: u32,
    pub missed_events: u32,
    pub attendance_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDigest {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
}

impl From<&Event> for EventDigest {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            date: event.date,
            location: event.location.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceHistory {
    pub member_id: String,
    #[serde(flatten)]
    pub streaks: StreakSummary,
    /// "YYYY-MM" -> attended events in that month
    pub monthly_attendance: BTreeMap<String, u32>,
    /// Chronological tail of the attended events
    pub recent_attended: Vec<EventDigest>,
    /// Chronological tail of the missed events
    pub recent_missed: Vec<EventDigest>,
}

pub fn month_key(date: DateTime<Utc>) -> String {
    date.format("%Y-%m").to_string()
}

/// Events ordered by date, ties broken by id so that the result does not
/// depend on the order the caller supplied
pub fn chronological(events: &[Event]) -> Vec<&Event> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    sorted
}

pub fn compute_streaks(member_id: &str, events: &[Event]) -> StreakSummary {
    let mut current_streak = 0u32;
    let mut max_streak = 0u32;
    let mut current_miss_streak = 0u32;
    let mut max_miss_streak = 0u32;
    let mut attended = 0u32;

    for event in chronological(events) {
        if event.has_attendee(member_id) {
            attended += 1;
            current_streak += 1;
            max_streak = max_streak.max(current_streak);
            current_miss_streak = 0;
        } else {
            current_miss_streak += 1;
            max_miss_streak = max_miss_streak.max(current_miss_streak);
            current_streak = 0;
        }
    }

    let total = events.len() as u32;
    StreakSummary {
        current_streak,
        max_streak,
        current_miss_streak,
        max_miss_streak,
        total_events: total,
        attended_events: attended,
        missed_events: total - attended,
        attendance_rate: attendance_rate(attended as usize, total as usize),
    }
}

fn tail(events: &[&Event]) -> Vec<EventDigest> {
    let start = events.len().saturating_sub(RECENT_EVENT_LIMIT);
    events[start..].iter().map(|e| EventDigest::from(*e)).collect()
}

pub fn attendance_history(member_id: &str, events: &[Event]) -> AttendanceHistory {
    let ordered = chronological(events);
    let (attended, missed): (Vec<&Event>, Vec<&Event>) =
        ordered.into_iter().partition(|e| e.has_attendee(member_id));

    let mut monthly_attendance = BTreeMap::new();
    for event in &attended {
        *monthly_attendance.entry(month_key(event.date)).or_insert(0) += 1;
    }

    AttendanceHistory {
        member_id: member_id.to_string(),
        streaks: compute_streaks(member_id, events),
        monthly_attendance,
        recent_attended: tail(&attended),
        recent_missed: tail(&missed),
    }
}
