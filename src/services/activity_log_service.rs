// ActivityLogService - CRUD over the audit trail plus fire-and-forget recording
// used by the other services after successful writes

use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::entities::{ActivityLog, CreateActivityLogRequest, Organization, UpdateActivityLogRequest};
use crate::error::AppResult;
use crate::infrastructure::{
    DocumentStore, Filter, IdGenerator, Page, PageRequest, Repository, RequestContext,
};

pub const ACTIVITY_LOG_SORTS: &[&str] = &["timestamp", "action"];

#[derive(Debug, Clone, Default)]
pub struct ActivityLogQuery {
    pub organization_id: Option<String>,
    pub search: Option<String>,
}

impl ActivityLogQuery {
    fn filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(organization_id) = &self.organization_id {
            filter = filter.eq("organizationId", organization_id.as_str());
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            filter = filter.contains(&["action", "details"], search.trim());
        }
        filter
    }
}

#[derive(Clone)]
pub struct ActivityLogService {
    logs: Repository<ActivityLog>,
    organizations: Repository<Organization>,
    ids: Arc<IdGenerator>,
}

impl ActivityLogService {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<IdGenerator>) -> Self {
        Self {
            logs: Repository::new(store.clone()),
            organizations: Repository::new(store),
            ids,
        }
    }

    pub async fn list(&self, query: &ActivityLogQuery, page: &PageRequest) -> AppResult<Page<ActivityLog>> {
        self.logs.page(&query.filter(), page).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<ActivityLog>> {
        self.logs.find_all(&Filter::new()).await
    }

    pub async fn get(&self, id: &str) -> AppResult<ActivityLog> {
        self.logs.get(id).await
    }

    pub async fn create(
        &self,
        request: CreateActivityLogRequest,
        ctx: &RequestContext,
    ) -> AppResult<ActivityLog> {
        self.organizations.get(&request.organization_id).await?;

        let log = ActivityLog {
            id: self.ids.next_id(),
            organization_id: request.organization_id,
            user_id: request.user_id.unwrap_or_else(|| ctx.actor.clone()),
            action: request.action.trim().to_string(),
            details: request.details.unwrap_or_default(),
            timestamp: request.timestamp.unwrap_or_else(Utc::now),
            metadata: request.metadata.unwrap_or_default(),
        };
        self.logs.insert(&log).await?;

        info!(log_id = %log.id, action = %log.action, "Activity log created");
        Ok(log)
    }

    pub async fn update(&self, id: &str, request: UpdateActivityLogRequest) -> AppResult<ActivityLog> {
        let mut log = self.logs.get(id).await?;
        if let Some(action) = request.action {
            log.action = action.trim().to_string();
        }
        if let Some(details) = request.details {
            log.details = details;
        }
        if let Some(metadata) = request.metadata {
            log.metadata = metadata;
        }
        self.logs.update(&log).await?;
        Ok(log)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.logs.get(id).await?;
        self.logs.delete(id).await?;
        info!(log_id = %id, "Activity log deleted");
        Ok(())
    }

    /// Append a trail entry for a completed write. Failures are logged and
    /// swallowed; the write being recorded has already happened.
    pub async fn record(
        &self,
        organization_id: &str,
        ctx: &RequestContext,
        action: &str,
        details: String,
        metadata: Value,
    ) {
        let metadata = match metadata {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        let log = ActivityLog {
            id: self.ids.next_id(),
            organization_id: organization_id.to_string(),
            user_id: ctx.actor.clone(),
            action: action.to_string(),
            details,
            timestamp: Utc::now(),
            metadata,
        };

        if let Err(e) = self.logs.insert(&log).await {
            warn!(
                request_id = %ctx.request_id,
                action,
                error = %e,
                "Failed to record activity"
            );
        }
    }
}
