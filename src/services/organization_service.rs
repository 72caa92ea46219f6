// OrganizationService - organization writes, member-count maintenance and
// the cascading delete

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::entities::organization::DEFAULT_MAX_MEMBERS;
use crate::entities::{
    CreateOrganizationRequest, Member, MemberStatus, Organization, OrganizationType,
    UpdateOrganizationRequest,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{
    Collection, DocumentStore, Filter, IdGenerator, Page, PageRequest, Repository,
    RequestContext, StoreTransaction,
};
use crate::services::ActivityLogService;

pub const ORGANIZATION_SORTS: &[&str] = &[
    "createdAt",
    "name",
    "type",
    "currentMembers",
    "maxMembers",
    "updatedAt",
];

#[derive(Debug, Clone, Default)]
pub struct OrganizationQuery {
    pub org_type: Option<OrganizationType>,
    pub search: Option<String>,
}

impl OrganizationQuery {
    fn filter(&self) -> AppResult<Filter> {
        let mut filter = Filter::new();
        if let Some(org_type) = self.org_type {
            filter = filter.eq("type", serde_json::to_value(org_type)?.as_str().unwrap_or_default());
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            filter = filter.contains(&["name", "description", "location"], search.trim());
        }
        Ok(filter)
    }
}

/// Outcome of a cascading organization delete
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDeletion {
    pub organization_id: String,
    pub deleted_members: u64,
}

pub(crate) fn active_members_filter(organization_id: &str) -> Filter {
    Filter::new()
        .eq("organizationId", organization_id)
        .eq("status", MemberStatus::Active.as_str())
}

#[derive(Clone)]
pub struct OrganizationService {
    store: Arc<dyn DocumentStore>,
    organizations: Repository<Organization>,
    members: Repository<Member>,
    activity: ActivityLogService,
    ids: Arc<IdGenerator>,
}

impl OrganizationService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        ids: Arc<IdGenerator>,
        activity: ActivityLogService,
    ) -> Self {
        Self {
            organizations: Repository::new(store.clone()),
            members: Repository::new(store.clone()),
            store,
            activity,
            ids,
        }
    }

    pub async fn list(
        &self,
        query: &OrganizationQuery,
        page: &PageRequest,
    ) -> AppResult<Page<Organization>> {
        self.organizations.page(&query.filter()?, page).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<Organization>> {
        self.organizations.find_all(&Filter::new()).await
    }

    pub async fn get(&self, id: &str) -> AppResult<Organization> {
        self.organizations.get(id).await
    }

    async fn ensure_unique_name(&self, name: &str, exclude_id: Option<&str>) -> AppResult<()> {
        let mut filter = Filter::new().eq("name", name);
        if let Some(id) = exclude_id {
            filter = filter.ne("id", id);
        }
        if self.organizations.exists(&filter).await? {
            warn!(name, "Rejected duplicate organization name");
            return Err(AppError::Conflict(format!(
                "Organization '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    pub async fn create(
        &self,
        request: CreateOrganizationRequest,
        ctx: &RequestContext,
    ) -> AppResult<Organization> {
        let name = request.name.trim().to_string();
        self.ensure_unique_name(&name, None).await?;

        let now = Utc::now();
        let organization = Organization {
            id: self.ids.next_id(),
            name,
            description: request.description.unwrap_or_default(),
            org_type: request.org_type.unwrap_or_default(),
            location: request.location.filter(|l| !l.trim().is_empty()),
            max_members: request.max_members.unwrap_or(DEFAULT_MAX_MEMBERS),
            current_members: 0,
            settings: request.settings.unwrap_or_default(),
            created_by: ctx.actor.clone(),
            created_at: now,
            updated_at: now,
        };
        self.organizations.insert(&organization).await?;

        info!(organization_id = %organization.id, name = %organization.name, "Organization created");
        self.activity
            .record(
                &organization.id,
                ctx,
                "organization_created",
                format!("Organization '{}' created", organization.name),
                json!({ "organizationName": organization.name }),
            )
            .await;
        Ok(organization)
    }

    pub async fn update(
        &self,
        id: &str,
        request: UpdateOrganizationRequest,
        ctx: &RequestContext,
    ) -> AppResult<Organization> {
        let mut organization = self.organizations.get(id).await?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name != organization.name {
                self.ensure_unique_name(&name, Some(id)).await?;
            }
            organization.name = name;
        }
        if let Some(description) = request.description {
            organization.description = description;
        }
        if let Some(org_type) = request.org_type {
            organization.org_type = org_type;
        }
        if let Some(location) = request.location {
            organization.location = Some(location).filter(|l| !l.trim().is_empty());
        }
        if let Some(settings) = request.settings {
            organization.settings = settings;
        }
        if let Some(max_members) = request.max_members {
            organization.set_max_members(max_members);
        }
        organization.updated_at = Utc::now();
        self.organizations.update(&organization).await?;

        info!(organization_id = %id, "Organization updated");
        self.activity
            .record(
                id,
                ctx,
                "organization_updated",
                format!("Organization '{}' updated", organization.name),
                json!({}),
            )
            .await;
        Ok(organization)
    }

    /// Delete the organization together with all of its members in one
    /// store transaction. Either both disappear or neither does.
    pub async fn delete(&self, id: &str, ctx: &RequestContext) -> AppResult<OrganizationDeletion> {
        let organization = self.organizations.get(id).await?;

        let mut tx = self.store.begin().await?;
        let deleted_members = match cascade_delete(tx.as_mut(), id).await {
            Ok(count) => count,
            Err(e) => {
                if let Err(abort_err) = tx.abort().await {
                    warn!(organization_id = %id, error = %abort_err, "Abort after failed delete also failed");
                }
                return Err(rolled_back(id, e));
            }
        };
        tx.commit().await.map_err(|e| rolled_back(id, e))?;

        info!(organization_id = %id, deleted_members, "Organization deleted");
        self.activity
            .record(
                id,
                ctx,
                "organization_deleted",
                format!(
                    "Organization '{}' deleted with {} members",
                    organization.name, deleted_members
                ),
                json!({ "deletedMembers": deleted_members }),
            )
            .await;

        Ok(OrganizationDeletion {
            organization_id: id.to_string(),
            deleted_members,
        })
    }

    /// Recompute `currentMembers` from the active-member count
    pub async fn sync_members(&self, id: &str) -> AppResult<Organization> {
        let mut organization = self.organizations.get(id).await?;
        let active = self.members.count(&active_members_filter(id)).await?;
        let before = organization.current_members;
        organization.set_current_members(active);
        organization.updated_at = Utc::now();
        self.organizations.update(&organization).await?;

        if before != organization.current_members {
            info!(
                organization_id = %id,
                before,
                after = organization.current_members,
                "Member count resynchronized"
            );
        }
        Ok(organization)
    }
}

async fn cascade_delete(tx: &mut dyn StoreTransaction, organization_id: &str) -> AppResult<u64> {
    let members = tx
        .delete_many(
            Collection::Members,
            &Filter::new().eq("organizationId", organization_id),
        )
        .await?;
    if !tx.delete_by_id(Collection::Organizations, organization_id).await? {
        return Err(AppError::NotFound(format!(
            "Organization {} not found",
            organization_id
        )));
    }
    Ok(members)
}

fn rolled_back(organization_id: &str, err: AppError) -> AppError {
    match err {
        AppError::Transaction(_) => err,
        other => AppError::Transaction(format!(
            "Delete of organization {} rolled back: {}",
            organization_id,
            other.message()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;

    fn service() -> (OrganizationService, MemoryStore) {
        let memory = MemoryStore::new();
        let store: Arc<dyn DocumentStore> = Arc::new(memory.clone());
        let ids = Arc::new(IdGenerator::new(1));
        let activity = ActivityLogService::new(store.clone(), ids.clone());
        (OrganizationService::new(store, ids, activity), memory)
    }

    fn request(name: &str) -> CreateOrganizationRequest {
        CreateOrganizationRequest {
            name: name.to_string(),
            description: None,
            org_type: None,
            location: None,
            max_members: Some(2),
            settings: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_and_duplicate_name() {
        let (service, _) = service();
        let ctx = RequestContext::system();

        let created = service.create(request("Hiking Club"), &ctx).await.unwrap();
        assert_eq!(created.current_members, 0);
        assert_eq!(created.org_type, OrganizationType::Club);
        assert_eq!(created.created_by, "system");

        let duplicate = service.create(request("Hiking Club"), &ctx).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        // Case-sensitive
        assert!(service.create(request("hiking club"), &ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_keeps_own_name_and_clamps_counter() {
        let (service, _) = service();
        let ctx = RequestContext::system();
        let mut created = service.create(request("Chess Club"), &ctx).await.unwrap();
        created.current_members = 2;
        service.organizations.update(&created).await.unwrap();

        let updated = service
            .update(
                &created.id,
                UpdateOrganizationRequest {
                    name: Some("Chess Club".to_string()),
                    max_members: Some(1),
                    ..Default::default()
                },
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(updated.max_members, 1);
        assert_eq!(updated.current_members, 1);
    }

    #[tokio::test]
    async fn test_delete_rolls_back_on_failure() {
        let (service, memory) = service();
        let ctx = RequestContext::system();
        let organization = service.create(request("Book Club"), &ctx).await.unwrap();

        let now = Utc::now();
        for (i, name) in ["Kim", "Lee"].iter().enumerate() {
            let member = Member {
                id: format!("m{}", i),
                name: name.to_string(),
                gender: crate::entities::Gender::Male,
                birth_year: 1990,
                district: String::new(),
                organization_id: organization.id.clone(),
                status: MemberStatus::Active,
                joined_at: now,
                created_at: now,
                updated_at: now,
            };
            service.members.insert(&member).await.unwrap();
        }

        memory.fail_deletes_in(Collection::Organizations).await;
        let failed = service.delete(&organization.id, &ctx).await;
        assert!(matches!(failed, Err(AppError::Transaction(_))));
        assert_eq!(service.members.count(&Filter::new()).await.unwrap(), 2);
        assert!(service.get(&organization.id).await.is_ok());

        memory.clear_failures().await;
        let deletion = service.delete(&organization.id, &ctx).await.unwrap();
        assert_eq!(deletion.deleted_members, 2);
        assert_eq!(service.members.count(&Filter::new()).await.unwrap(), 0);
        assert!(matches!(
            service.get(&organization.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sync_members_counts_active_only() {
        let (service, _) = service();
        let ctx = RequestContext::system();
        let organization = service.create(request("Run Club"), &ctx).await.unwrap();

        let now = Utc::now();
        for (id, status) in [("a", MemberStatus::Active), ("b", MemberStatus::Inactive)] {
            let member = Member {
                id: id.to_string(),
                name: format!("Member {}", id),
                gender: crate::entities::Gender::Female,
                birth_year: 1995,
                district: String::new(),
                organization_id: organization.id.clone(),
                status,
                joined_at: now,
                created_at: now,
                updated_at: now,
            };
            service.members.insert(&member).await.unwrap();
        }

        let synced = service.sync_members(&organization.id).await.unwrap();
        assert_eq!(synced.current_members, 1);
    }
}
