// AnalyticsService - loads the collections a report needs and hands them to
// the pure aggregators in `crate::analytics`

use futures::try_join;
use std::sync::Arc;
use tracing::debug;

use crate::analytics::{self, DateRange, MemberReport, OrganizationReport, SystemReport};
use crate::entities::{Event, Member, Organization};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DocumentStore, Filter, Repository};

#[derive(Clone)]
pub struct AnalyticsService {
    organizations: Repository<Organization>,
    members: Repository<Member>,
    events: Repository<Event>,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            organizations: Repository::new(store.clone()),
            members: Repository::new(store.clone()),
            events: Repository::new(store),
        }
    }

    async fn load_organization(&self, organization_id: &str) -> AppResult<(Organization, Vec<Member>, Vec<Event>)> {
        let in_organization = Filter::new().eq("organizationId", organization_id);
        try_join!(
            self.organizations.get(organization_id),
            self.members.find_all(&in_organization),
            self.events.find_all(&in_organization),
        )
    }

    pub async fn organization_report(
        &self,
        organization_id: &str,
        range: Option<DateRange>,
        search: Option<&str>,
    ) -> AppResult<OrganizationReport> {
        let (organization, members, events) = self.load_organization(organization_id).await?;
        debug!(
            organization_id,
            members = members.len(),
            events = events.len(),
            "Building organization report"
        );
        Ok(analytics::organization_report(
            &organization,
            &members,
            &events,
            range.as_ref(),
            search,
        ))
    }

    pub async fn member_report(
        &self,
        organization_id: &str,
        member_id: &str,
        range: Option<DateRange>,
    ) -> AppResult<MemberReport> {
        let (organization, members, events) = self.load_organization(organization_id).await?;
        let member = members
            .into_iter()
            .find(|m| m.id == member_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Member {} not found in organization {}",
                    member_id, organization_id
                ))
            })?;
        Ok(analytics::member_report(
            &organization,
            &member,
            &events,
            range.as_ref(),
        ))
    }

    pub async fn system_report(&self, range: Option<DateRange>) -> AppResult<SystemReport> {
        let everything = Filter::new();
        let (organizations, members, events) = try_join!(
            self.organizations.find_all(&everything),
            self.members.find_all(&everything),
            self.events.find_all(&everything),
        )?;
        Ok(analytics::system_report(
            &organizations,
            &members,
            &events,
            range.as_ref(),
        ))
    }
}
