use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    infrastructure::{DocumentStore, IdGenerator, MemoryStore, SqliteStore},
    services::{
        ActivityLogService, AnalyticsService, DashboardService, EventService, MemberService,
        OrganizationService,
    },
};

pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub organizations: OrganizationService,
    pub members: MemberService,
    pub events: EventService,
    pub activity_logs: ActivityLogService,
    pub analytics: AnalyticsService,
    pub dashboard: DashboardService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = if config.database.url == MEMORY_DATABASE_URL {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(SqliteStore::connect(&config.database.url).await?)
        };
        info!(backend = store.backend(), "Document store ready");

        Ok(Self::with_store(config, store))
    }

    /// Wire the services over an already opened store
    pub fn with_store(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let ids = Arc::new(IdGenerator::new(config.app.node_id));
        let activity_logs = ActivityLogService::new(store.clone(), ids.clone());

        Self {
            organizations: OrganizationService::new(store.clone(), ids.clone(), activity_logs.clone()),
            members: MemberService::new(store.clone(), ids.clone(), activity_logs.clone()),
            events: EventService::new(store.clone(), ids, activity_logs.clone()),
            analytics: AnalyticsService::new(store.clone()),
            dashboard: DashboardService::new(store.clone()),
            activity_logs,
            store,
            config,
        }
    }
}
