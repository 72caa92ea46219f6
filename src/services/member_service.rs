// MemberService - member writes guarded by organization capacity and
// per-organization name uniqueness

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::entities::{
    CreateMemberRequest, Member, MemberStatus, Organization, UpdateMemberRequest,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{
    DocumentStore, Filter, IdGenerator, Page, PageRequest, Repository, RequestContext,
};
use crate::services::organization_service::active_members_filter;
use crate::services::ActivityLogService;

pub const MEMBER_SORTS: &[&str] = &[
    "createdAt",
    "name",
    "birthYear",
    "district",
    "joinedAt",
    "updatedAt",
];

#[derive(Debug, Clone, Default)]
pub struct MemberQuery {
    pub organization_id: Option<String>,
    pub status: Option<MemberStatus>,
    pub search: Option<String>,
}

impl MemberQuery {
    fn filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(organization_id) = &self.organization_id {
            filter = filter.eq("organizationId", organization_id.as_str());
        }
        if let Some(status) = self.status {
            filter = filter.eq("status", status.as_str());
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            filter = filter.contains(&["name", "district"], search.trim());
        }
        filter
    }
}

#[derive(Clone)]
pub struct MemberService {
    members: Repository<Member>,
    organizations: Repository<Organization>,
    activity: ActivityLogService,
    ids: Arc<IdGenerator>,
}

impl MemberService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        ids: Arc<IdGenerator>,
        activity: ActivityLogService,
    ) -> Self {
        Self {
            members: Repository::new(store.clone()),
            organizations: Repository::new(store),
            activity,
            ids,
        }
    }

    pub async fn list(&self, query: &MemberQuery, page: &PageRequest) -> AppResult<Page<Member>> {
        self.members.page(&query.filter(), page).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<Member>> {
        self.members.find_all(&Filter::new()).await
    }

    pub async fn get(&self, id: &str) -> AppResult<Member> {
        self.members.get(id).await
    }

    async fn ensure_unique_name(
        &self,
        organization_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> AppResult<()> {
        let mut filter = Filter::new()
            .eq("organizationId", organization_id)
            .eq("name", name);
        if let Some(id) = exclude_id {
            filter = filter.ne("id", id);
        }
        if self.members.exists(&filter).await? {
            warn!(organization_id, name, "Rejected duplicate member name");
            return Err(AppError::Conflict(format!(
                "Member '{}' already exists in this organization",
                name
            )));
        }
        Ok(())
    }

    /// Room for one more active member; counts the store, not the cached counter
    async fn ensure_capacity(&self, organization: &Organization) -> AppResult<()> {
        let active = self.members.count(&active_members_filter(&organization.id)).await?;
        if active >= organization.max_members as u64 {
            warn!(organization_id = %organization.id, active, "Organization is full");
            return Err(AppError::Capacity(format!(
                "Organization '{}' already has the maximum of {} members",
                organization.name, organization.max_members
            )));
        }
        Ok(())
    }

    async fn resync_count(&self, organization_id: &str) -> AppResult<()> {
        let mut organization = self.organizations.get(organization_id).await?;
        let active = self.members.count(&active_members_filter(organization_id)).await?;
        organization.set_current_members(active);
        organization.updated_at = Utc::now();
        self.organizations.update(&organization).await
    }

    pub async fn create(&self, request: CreateMemberRequest, ctx: &RequestContext) -> AppResult<Member> {
        let mut organization = self.organizations.get(&request.organization_id).await?;
        let status = request.status.unwrap_or_default();
        if status == MemberStatus::Active {
            self.ensure_capacity(&organization).await?;
        }

        let name = request.name.trim().to_string();
        self.ensure_unique_name(&organization.id, &name, None).await?;

        let now = Utc::now();
        let member = Member {
            id: self.ids.next_id(),
            name,
            gender: request.gender,
            birth_year: request.birth_year,
            district: request.district.unwrap_or_default().trim().to_string(),
            organization_id: organization.id.clone(),
            status,
            joined_at: request.joined_at.unwrap_or(now),
            created_at: now,
            updated_at: now,
        };
        self.members.insert(&member).await?;

        if member.is_active() {
            organization.increment_members();
            organization.updated_at = now;
            self.organizations.update(&organization).await?;
        }

        info!(member_id = %member.id, organization_id = %organization.id, "Member created");
        self.activity
            .record(
                &organization.id,
                ctx,
                "member_added",
                format!("Member '{}' joined", member.name),
                json!({ "memberId": member.id, "memberName": member.name }),
            )
            .await;
        Ok(member)
    }

    pub async fn update(
        &self,
        id: &str,
        request: UpdateMemberRequest,
        ctx: &RequestContext,
    ) -> AppResult<Member> {
        let mut member = self.members.get(id).await?;
        let previous_organization = member.organization_id.clone();

        if let Some(organization_id) = request.organization_id {
            if organization_id != member.organization_id {
                let target = self.organizations.get(&organization_id).await?;
                if member.is_active() {
                    self.ensure_capacity(&target).await?;
                }
                member.organization_id = organization_id;
            }
        }
        if let Some(name) = request.name {
            member.name = name.trim().to_string();
        }
        if let Some(gender) = request.gender {
            member.gender = gender;
        }
        if let Some(birth_year) = request.birth_year {
            member.birth_year = birth_year;
        }
        if let Some(district) = request.district {
            member.district = district.trim().to_string();
        }

        self.ensure_unique_name(&member.organization_id, &member.name, Some(id))
            .await?;
        member.updated_at = Utc::now();
        self.members.update(&member).await?;

        if previous_organization != member.organization_id {
            self.resync_count(&previous_organization).await?;
            self.resync_count(&member.organization_id).await?;
            self.activity
                .record(
                    &member.organization_id,
                    ctx,
                    "member_transferred",
                    format!("Member '{}' transferred in", member.name),
                    json!({ "memberId": member.id, "from": previous_organization }),
                )
                .await;
        }

        info!(member_id = %id, "Member updated");
        Ok(member)
    }

    pub async fn change_status(
        &self,
        id: &str,
        status: MemberStatus,
        ctx: &RequestContext,
    ) -> AppResult<Member> {
        let mut member = self.members.get(id).await?;
        if member.status == status {
            return Ok(member);
        }
        if status == MemberStatus::Active {
            let organization = self.organizations.get(&member.organization_id).await?;
            self.ensure_capacity(&organization).await?;
        }

        member.status = status;
        member.updated_at = Utc::now();
        self.members.update(&member).await?;
        self.resync_count(&member.organization_id).await?;

        info!(member_id = %id, status = status.as_str(), "Member status changed");
        self.activity
            .record(
                &member.organization_id,
                ctx,
                "member_status_changed",
                format!("Member '{}' is now {}", member.name, status.as_str()),
                json!({ "memberId": member.id, "status": status.as_str() }),
            )
            .await;
        Ok(member)
    }

    pub async fn delete(&self, id: &str, ctx: &RequestContext) -> AppResult<()> {
        let member = self.members.get(id).await?;
        self.members.delete(id).await?;

        if member.is_active() {
            match self.organizations.find_by_id(&member.organization_id).await? {
                Some(mut organization) => {
                    organization.decrement_members();
                    organization.updated_at = Utc::now();
                    self.organizations.update(&organization).await?;
                }
                None => warn!(member_id = %id, "Deleted member had no organization"),
            }
        }

        info!(member_id = %id, "Member deleted");
        self.activity
            .record(
                &member.organization_id,
                ctx,
                "member_removed",
                format!("Member '{}' removed", member.name),
                json!({ "memberId": member.id }),
            )
            .await;
        Ok(())
    }
}
