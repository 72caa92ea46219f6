// Attendance analytics - pure, synchronous computations over loaded
// collections. Nothing here touches the store.

pub mod filters;
pub mod member_stats;
pub mod org_stats;
pub mod rules;
pub mod streaks;

#[cfg(test)]
pub(crate) mod test_support;

pub use member_stats::{MemberStats, RiskLevel};
pub use org_stats::{
    member_report, organization_report, system_report, MemberReport, OrganizationReport,
    SystemReport,
};
pub use rules::{required_attendance, DateRange, ParticipationRule};
pub use streaks::{AttendanceHistory, StreakSummary};
