// Services - business rules over the document store. Each service owns the
// typed repositories it needs and records the activity trail for its writes.

pub mod activity_log_service;
pub mod analytics_service;
pub mod dashboard_service;
pub mod event_service;
pub mod member_service;
pub mod organization_service;

pub use activity_log_service::{ActivityLogQuery, ActivityLogService, ACTIVITY_LOG_SORTS};
pub use analytics_service::AnalyticsService;
pub use dashboard_service::{Dashboard, DashboardService, DashboardTotals};
pub use event_service::{EventQuery, EventService, EVENT_SORTS};
pub use member_service::{MemberQuery, MemberService, MEMBER_SORTS};
pub use organization_service::{
    OrganizationDeletion, OrganizationQuery, OrganizationService, ORGANIZATION_SORTS,
};
