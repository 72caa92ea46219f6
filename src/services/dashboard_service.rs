// DashboardService - one-shot load of every collection for the dashboard view

use futures::try_join;
use serde::Serialize;
use std::sync::Arc;

use crate::analytics::filters::{search_events, search_members, search_organizations};
use crate::entities::{ActivityLog, Event, Member, Organization};
use crate::error::AppResult;
use crate::infrastructure::{DocumentStore, Filter, Repository};

pub const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub organizations: u64,
    pub members: u64,
    pub active_members: u64,
    pub events: u64,
    pub activity_logs: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub totals: DashboardTotals,
    pub organizations: Vec<Organization>,
    pub members: Vec<Member>,
    pub events: Vec<Event>,
    pub activity_logs: Vec<ActivityLog>,
    /// Newest first
    pub recent_activity: Vec<ActivityLog>,
}

#[derive(Clone)]
pub struct DashboardService {
    organizations: Repository<Organization>,
    members: Repository<Member>,
    events: Repository<Event>,
    activity_logs: Repository<ActivityLog>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            organizations: Repository::new(store.clone()),
            members: Repository::new(store.clone()),
            events: Repository::new(store.clone()),
            activity_logs: Repository::new(store),
        }
    }

    /// All four collections are fetched concurrently; any failure fails the load.
    /// `search` narrows the listed organizations, members and events; totals
    /// always cover everything.
    pub async fn load(&self, search: Option<&str>) -> AppResult<Dashboard> {
        let everything = Filter::new();
        let (organizations, members, events, activity_logs) = try_join!(
            self.organizations.find_all(&everything),
            self.members.find_all(&everything),
            self.events.find_all(&everything),
            self.activity_logs.find_all(&everything),
        )?;

        let mut recent_activity = activity_logs.clone();
        recent_activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent_activity.truncate(RECENT_ACTIVITY_LIMIT);

        let totals = DashboardTotals {
            organizations: organizations.len() as u64,
            members: members.len() as u64,
            active_members: members.iter().filter(|m| m.is_active()).count() as u64,
            events: events.len() as u64,
            activity_logs: activity_logs.len() as u64,
        };

        let (organizations, members, events) = match search {
            Some(needle) => (
                search_organizations(&organizations, needle),
                search_members(&members, needle),
                search_events(&events, needle),
            ),
            None => (organizations, members, events),
        };

        Ok(Dashboard {
            totals,
            organizations,
            members,
            events,
            activity_logs,
            recent_activity,
        })
    }
}
