// Rule Evaluator - turns an organization's participation rule into a
// required-attendance threshold for a reporting period

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

pub const MAX_ATTENDANCES_PER_MONTH: u32 = 10;

/// Minimum attendances per calendar month, or no requirement at all.
/// Serialized as `"unlimited"` or a decimal string `"1"`..`"10"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParticipationRule {
    #[default]
    Unlimited,
    PerMonth(u32),
}

impl FromStr for ParticipationRule {
    type Err = AppError;

    fn from_str(raw: &str) -> AppResult<Self> {
        if raw == "unlimited" {
            return Ok(ParticipationRule::Unlimited);
        }
        match raw.parse::<u32>() {
            // Canonical spelling only: no sign, no leading zeros
            Ok(n) if (1..=MAX_ATTENDANCES_PER_MONTH).contains(&n) && n.to_string() == raw => {
                Ok(ParticipationRule::PerMonth(n))
            }
            _ => Err(AppError::Validation(format!(
                "participationRule must be \"unlimited\" or an integer between 1 and {}, got \"{}\"",
                MAX_ATTENDANCES_PER_MONTH, raw
            ))),
        }
    }
}

impl TryFrom<String> for ParticipationRule {
    type Error = AppError;

    fn try_from(raw: String) -> AppResult<Self> {
        raw.parse()
    }
}

impl From<ParticipationRule> for String {
    fn from(rule: ParticipationRule) -> Self {
        rule.to_string()
    }
}

impl fmt::Display for ParticipationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipationRule::Unlimited => write!(f, "unlimited"),
            ParticipationRule::PerMonth(n) => write!(f, "{}", n),
        }
    }
}

/// Inclusive calendar-day reporting range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(rename = "startDate")]
    pub start: NaiveDate,
    #[serde(rename = "endDate")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Build an ordered range; inverted ranges are rejected here, at the
    /// request boundary, because the evaluator itself does not check them.
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if end < start {
            return Err(AppError::Validation(format!(
                "endDate {} is before startDate {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let day = instant.date_naive();
        day >= self.start && day <= self.end
    }

    pub fn months_spanned(&self) -> u32 {
        let diff = month_difference(self.end, self.start) + 1;
        diff.max(1) as u32
    }
}

/// Whole-month distance between two dates, ignoring the day of month
pub fn month_difference(end: NaiveDate, start: NaiveDate) -> i32 {
    (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32
}

pub fn months_in_range(range: Option<&DateRange>) -> u32 {
    range.map(DateRange::months_spanned).unwrap_or(1)
}

pub fn required_attendance(rule: ParticipationRule, range: Option<&DateRange>) -> u32 {
    match rule {
        ParticipationRule::Unlimited => 0,
        ParticipationRule::PerMonth(n) => n * months_in_range(range),
    }
}

/// Evaluate a raw rule string; malformed rules raise instead of defaulting.
pub fn required_attendance_for(rule: &str, range: Option<&DateRange>) -> AppResult<u32> {
    Ok(required_attendance(rule.parse()?, range))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_unlimited_requires_nothing() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert_eq!(required_attendance(ParticipationRule::Unlimited, Some(&range)), 0);
        assert_eq!(required_attendance(ParticipationRule::Unlimited, None), 0);
    }

    #[test]
    fn test_per_month_over_three_months() {
        let range = DateRange::new(date(2024, 3, 15), date(2024, 5, 2)).unwrap();
        assert_eq!(range.months_spanned(), 3);
        assert_eq!(required_attendance_for("2", Some(&range)).unwrap(), 6);
    }

    #[test]
    fn test_no_range_defaults_to_one_month() {
        assert_eq!(required_attendance_for("3", None).unwrap(), 3);
    }

    #[test]
    fn test_same_month_counts_once() {
        let range = DateRange::new(date(2024, 2, 1), date(2024, 2, 1)).unwrap();
        assert_eq!(range.months_spanned(), 1);
    }

    #[test]
    fn test_months_across_year_boundary() {
        let range = DateRange::new(date(2023, 11, 20), date(2024, 2, 3)).unwrap();
        assert_eq!(range.months_spanned(), 4);
    }

    #[test]
    fn test_inverted_range_is_clamped_by_evaluator() {
        let inverted = DateRange {
            start: date(2024, 6, 1),
            end: date(2024, 1, 1),
        };
        assert_eq!(required_attendance(ParticipationRule::PerMonth(2), Some(&inverted)), 2);
        assert!(DateRange::new(inverted.start, inverted.end).is_err());
    }

    #[test]
    fn test_malformed_rules_are_rejected() {
        for raw in ["0", "11", "-1", "two", "", "Unlimited", "+5", "05", "007", " 3", "10.0"] {
            assert!(
                matches!(required_attendance_for(raw, None), Err(AppError::Validation(_))),
                "rule {:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_rule_serializes_as_string() {
        let rule: ParticipationRule = serde_json::from_str("\"4\"").unwrap();
        assert_eq!(rule, ParticipationRule::PerMonth(4));
        assert_eq!(serde_json::to_string(&ParticipationRule::Unlimited).unwrap(), "\"unlimited\"");
        assert!(serde_json::from_str::<ParticipationRule>("\"12\"").is_err());
        assert!(serde_json::from_str::<ParticipationRule>("\"05\"").is_err());
    }

    #[test]
    fn test_range_contains_whole_end_day() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let late = date(2024, 1, 31).and_hms_opt(23, 30, 0).unwrap().and_utc();
        let next = date(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap().and_utc();
        assert!(range.contains(late));
        assert!(!range.contains(next));
    }
}
