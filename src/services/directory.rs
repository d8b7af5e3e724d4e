use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{CoreError, CoreResult};
use crate::auth::{evaluate, within_organization, Capability, Principal};
use crate::database::models::{Intermediate, Organization, Terminal};
use crate::database::queries::{IntermediateQuery, OrganizationQuery, TerminalQuery};
use crate::database::CertificateStore;
use crate::types::Page;

/// Read side of the hierarchy. Listings only return active records; a
/// listing with no matches is an empty page, not an error.
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn CertificateStore>,
}

impl Directory {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }

    fn check(principal: &Principal, capability: Capability) -> CoreResult<()> {
        evaluate(principal, capability, Utc::now()).into_result().map_err(CoreError::Denied)
    }

    fn check_organization(principal: &Principal, token: &str) -> CoreResult<()> {
        within_organization(principal, token).into_result().map_err(CoreError::Denied)
    }

    pub async fn list_organizations(&self, principal: &Principal, page: Page) -> CoreResult<Vec<Organization>> {
        Self::check(principal, Capability::MANAGE_ORGANIZATIONS)?;
        let query = OrganizationQuery::all().active(Utc::now());
        Ok(self.store.list_organizations(&query, page).await?)
    }

    pub async fn organization(&self, principal: &Principal, id: Uuid) -> CoreResult<Organization> {
        Self::check(principal, Capability::MANAGE_ORGANIZATIONS)?;
        self.store
            .find_organization(&OrganizationQuery::by_id(id))
            .await?
            .ok_or_else(|| CoreError::NotFound("Organization".to_string()))
    }

    /// Members read their own organization's intermediates; Super Admins may
    /// name any organization
    pub async fn list_intermediates(
        &self,
        principal: &Principal,
        organization: Option<String>,
        page: Page,
    ) -> CoreResult<Vec<Intermediate>> {
        Self::check(principal, Capability::USE_TERMINALS)?;
        let token = organization
            .or_else(|| principal.organization_token.clone())
            .ok_or_else(|| CoreError::InvalidInput("organization is required".to_string()))?;
        Self::check_organization(principal, &token)?;
        let query = IntermediateQuery::in_organization(token).active(Utc::now());
        Ok(self.store.list_intermediates(&query, page).await?)
    }

    pub async fn intermediate(&self, principal: &Principal, id: Uuid) -> CoreResult<Intermediate> {
        Self::check(principal, Capability::USE_TERMINALS)?;
        let record = self
            .store
            .find_intermediate(&IntermediateQuery::by_id(id))
            .await?
            .ok_or_else(|| CoreError::NotFound("Intermediate".to_string()))?;
        Self::check_organization(principal, &record.organization_token)?;
        Ok(record)
    }

    pub async fn list_terminals(&self, principal: &Principal, intermediate_id: Uuid, page: Page) -> CoreResult<Vec<Terminal>> {
        let parent = self.intermediate(principal, intermediate_id).await?;
        let query = TerminalQuery::under(parent.id).active(Utc::now());
        Ok(self.store.list_terminals(&query, page).await?)
    }

    pub async fn terminal(&self, principal: &Principal, id: Uuid) -> CoreResult<Terminal> {
        Self::check(principal, Capability::USE_TERMINALS)?;
        let record = self
            .store
            .find_terminal(&TerminalQuery::by_id(id))
            .await?
            .ok_or_else(|| CoreError::NotFound("Terminal".to_string()))?;
        Self::check_organization(principal, &record.organization_token)?;
        Ok(record)
    }
}
