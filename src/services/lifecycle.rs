//! Issue, update and revoke across the organization → intermediate →
//! terminal hierarchy. Each operation evaluates the role policy, validates
//! the hierarchy and then performs exactly one atomic store write.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{CoreError, CoreResult};
use super::hierarchy::{duplicate, HierarchyValidator};
use super::naming;
use super::quota::QuotaLedger;
use crate::auth::{evaluate, within_organization, Capability, DenyReason, Principal, Privilege};
use crate::config::QuotaConfig;
use crate::database::models::{
    CertificateProfile, Intermediate, IntermediateKind, IntermediatePatch, Organization, OrganizationPatch,
    QuotaKind, SignerCredential, Terminal, TerminalPatch,
};
use crate::database::queries::{IntermediateQuery, OrganizationQuery, TerminalQuery};
use crate::database::{CertificateStore, Insertion, Modification};
use crate::types::EntityLevel;

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    #[serde(default)]
    pub signing_quota: Option<i64>,
    #[serde(default)]
    pub certificate_quota: Option<i64>,
    pub signer: SignerCredential,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIntermediate {
    /// Defaults to the caller's own organization
    #[serde(default)]
    pub organization_token: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IntermediateKind,
    pub detail: CertificateProfile,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTerminal {
    pub intermediate_id: Uuid,
    pub name: String,
    pub detail: CertificateProfile,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

fn authorize(principal: &Principal, capability: Capability, now: DateTime<Utc>) -> CoreResult<()> {
    evaluate(principal, capability, now).into_result().map_err(|reason| {
        warn!("Denied {} ({:?}): {:?}", principal.username, capability, reason);
        CoreError::Denied(reason)
    })
}

fn authorize_organization(principal: &Principal, organization_token: &str) -> CoreResult<()> {
    within_organization(principal, organization_token).into_result().map_err(|reason| {
        warn!("Denied {}: outside organization", principal.username);
        CoreError::Denied(reason)
    })
}

/// Disabled records never become active again
fn reject_reactivation(currently_disabled: bool, requested: Option<bool>, level: EntityLevel) -> CoreResult<()> {
    if currently_disabled && requested == Some(false) {
        return Err(CoreError::InvalidTransition(format!("A disabled {} cannot be re-enabled", level)));
    }
    Ok(())
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Clone)]
pub struct LifecycleOrchestrator {
    store: Arc<dyn CertificateStore>,
    validator: HierarchyValidator,
    ledger: QuotaLedger,
    quota_defaults: QuotaConfig,
}

impl LifecycleOrchestrator {
    pub fn new(
        store: Arc<dyn CertificateStore>,
        validator: HierarchyValidator,
        ledger: QuotaLedger,
        quota_defaults: QuotaConfig,
    ) -> Self {
        Self { store, validator, ledger, quota_defaults }
    }

    // ---- organizations ----

    pub async fn issue_organization(&self, principal: &Principal, request: NewOrganization) -> CoreResult<Organization> {
        let now = Utc::now();
        authorize(principal, Capability::MANAGE_ORGANIZATIONS, now)?;
        naming::subject(&request.name)?;

        let signing = request.signing_quota.unwrap_or(self.quota_defaults.default_signing_quota);
        let certificate = request.certificate_quota.unwrap_or(self.quota_defaults.default_certificate_quota);
        if signing < 0 || certificate < 0 {
            return Err(CoreError::InvalidInput("quota must not be negative".to_string()));
        }

        let org = Organization {
            id: Uuid::new_v4(),
            token: generate_token(),
            name: request.name,
            signing_quota: signing,
            signing_quota_remaining: signing,
            certificate_quota: certificate,
            certificate_quota_remaining: certificate,
            signer: request.signer,
            expiration: request.expiration,
            date: now,
        };
        let name = org.name.clone();
        match self.store.insert_organization(org).await? {
            Insertion::Inserted(org) => {
                info!("Issued organization '{}' by {}", org.name, principal.username);
                Ok(org)
            }
            _ => Err(duplicate(EntityLevel::Organization, &name)),
        }
    }

    pub async fn update_organization(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: OrganizationPatch,
    ) -> CoreResult<Organization> {
        authorize(principal, Capability::MANAGE_ORGANIZATIONS, Utc::now())?;
        if patch.is_empty() {
            return Err(CoreError::InvalidInput("Nothing to update".to_string()));
        }
        if let Some(name) = &patch.name {
            naming::subject(name)?;
        }
        let name = patch.name.clone().unwrap_or_default();
        match self.store.update_organization(id, patch).await? {
            Modification::Modified(org) => {
                info!("Updated organization '{}' by {}", org.name, principal.username);
                Ok(org)
            }
            Modification::NotFound => Err(CoreError::NotFound("Organization".to_string())),
            Modification::Duplicate => Err(duplicate(EntityLevel::Organization, &name)),
        }
    }

    pub async fn grant_quota(
        &self,
        principal: &Principal,
        id: Uuid,
        kind: QuotaKind,
        amount: i64,
    ) -> CoreResult<Organization> {
        authorize(principal, Capability::MANAGE_ORGANIZATIONS, Utc::now())?;
        let org = self
            .store
            .find_organization(&OrganizationQuery::by_id(id))
            .await?
            .ok_or_else(|| CoreError::NotFound("Organization".to_string()))?;
        self.ledger.grant(&org.token, kind, amount).await
    }

    // ---- intermediates ----

    pub async fn issue_intermediate(&self, principal: &Principal, request: NewIntermediate) -> CoreResult<Intermediate> {
        let now = Utc::now();
        authorize(principal, Capability::MANAGE_INTERMEDIATES, now)?;

        let token = request
            .organization_token
            .or_else(|| principal.organization_token.clone())
            .ok_or_else(|| CoreError::InvalidInput("organization_token is required".to_string()))?;
        authorize_organization(principal, &token)?;
        naming::subject(&request.name)?;
        request.detail.validate().map_err(CoreError::InvalidInput)?;

        let org = self.validator.validate_intermediate_creation(&token, &request.name, now).await?;

        let record = Intermediate {
            id: Uuid::new_v4(),
            organization_token: token.clone(),
            name: request.name,
            kind: request.kind,
            detail: request.detail.with_signer(&org.signer.profile_name, &org.signer.password),
            expiration: request.expiration,
            disabled: false,
            date: now,
        };
        let subject = record.name.clone();
        let debit = self.ledger.debit(&token, QuotaKind::Signing);
        let outcome = self.store.insert_intermediate(record, Some(debit)).await?;
        let created = self.validator.settle(outcome, EntityLevel::Intermediate, &subject, QuotaKind::Signing)?;

        info!("Issued intermediate '{}' under organization '{}' by {}", created.name, org.name, principal.username);
        Ok(created)
    }

    pub async fn update_intermediate(
        &self,
        principal: &Principal,
        id: Uuid,
        mut patch: IntermediatePatch,
    ) -> CoreResult<Intermediate> {
        authorize(principal, Capability::MANAGE_INTERMEDIATES, Utc::now())?;
        if patch.is_empty() {
            return Err(CoreError::InvalidInput("Nothing to update".to_string()));
        }
        let current = self
            .store
            .find_intermediate(&IntermediateQuery::by_id(id))
            .await?
            .ok_or_else(|| CoreError::NotFound("Intermediate".to_string()))?;
        authorize_organization(principal, &current.organization_token)?;
        reject_reactivation(current.disabled, patch.disabled, EntityLevel::Intermediate)?;
        if let Some(name) = &patch.name {
            naming::subject(name)?;
        }
        if let Some(detail) = patch.detail.take() {
            detail.validate().map_err(CoreError::InvalidInput)?;
            patch.detail =
                Some(detail.with_signer(&current.detail.signer_profile_name, &current.detail.signer_password));
        }

        let name = patch.name.clone().unwrap_or_default();
        match self.store.update_intermediate(id, patch).await? {
            Modification::Modified(record) => {
                info!("Updated intermediate '{}' by {}", record.name, principal.username);
                Ok(record)
            }
            Modification::NotFound => Err(CoreError::NotFound("Intermediate".to_string())),
            Modification::Duplicate => Err(duplicate(EntityLevel::Intermediate, &name)),
        }
    }

    // ---- terminals ----

    pub async fn issue_terminal(&self, principal: &Principal, request: NewTerminal) -> CoreResult<Terminal> {
        let now = Utc::now();
        authorize(principal, Capability::USE_TERMINALS, now)?;
        naming::terminal_subject(&request.name)?;
        request.detail.validate().map_err(CoreError::InvalidInput)?;

        let parent = self.validator.terminal_parent(request.intermediate_id).await?;
        authorize_organization(principal, &parent.organization_token)?;
        self.validator.validate_terminal_creation(&parent, &request.name, now).await?;

        let owner = principal.as_person();
        let record = Terminal {
            id: Uuid::new_v4(),
            intermediate_id: parent.id,
            organization_token: parent.organization_token.clone(),
            name: request.name,
            owner: owner.clone(),
            available_people: vec![owner],
            detail: request
                .detail
                .with_signer(&parent.detail.signer_profile_name, &parent.detail.signer_password),
            expiration: request.expiration,
            disabled: false,
            date: now,
        };
        let subject = record.name.clone();
        let debit = self.ledger.debit(&parent.organization_token, QuotaKind::Certificate);
        let outcome = self.store.insert_terminal(record, Some(debit)).await?;
        let created = self.validator.settle(outcome, EntityLevel::Terminal, &subject, QuotaKind::Certificate)?;

        info!("Issued terminal '{}' under intermediate '{}' to {}", created.name, parent.name, principal.username);
        Ok(created)
    }

    /// Owner of the terminal, or an Admin of its organization
    pub async fn update_terminal(&self, principal: &Principal, id: Uuid, mut patch: TerminalPatch) -> CoreResult<Terminal> {
        authorize(principal, Capability::USE_TERMINALS, Utc::now())?;
        if patch.is_empty() {
            return Err(CoreError::InvalidInput("Nothing to update".to_string()));
        }
        let current = self
            .store
            .find_terminal(&TerminalQuery::by_id(id))
            .await?
            .ok_or_else(|| CoreError::NotFound("Terminal".to_string()))?;
        authorize_organization(principal, &current.organization_token)?;
        if current.owner.uid != principal.id && Privilege::of(principal.role) < Privilege::Admin {
            return Err(CoreError::Denied(DenyReason::InsufficientRole));
        }
        reject_reactivation(current.disabled, patch.disabled, EntityLevel::Terminal)?;
        if let Some(name) = &patch.name {
            naming::terminal_subject(name)?;
        }
        if let Some(detail) = patch.detail.take() {
            detail.validate().map_err(CoreError::InvalidInput)?;
            patch.detail =
                Some(detail.with_signer(&current.detail.signer_profile_name, &current.detail.signer_password));
        }

        let name = patch.name.clone().unwrap_or_default();
        match self.store.update_terminal(id, patch).await? {
            Modification::Modified(record) => {
                info!("Updated terminal '{}' by {}", record.name, principal.username);
                Ok(record)
            }
            Modification::NotFound => Err(CoreError::NotFound("Terminal".to_string())),
            Modification::Duplicate => Err(duplicate(EntityLevel::Terminal, &name)),
        }
    }

    // ---- revocation ----

    /// Hard delete of a single record. Children are left in place.
    pub async fn revoke(&self, principal: &Principal, level: EntityLevel, id: Uuid) -> CoreResult<()> {
        let now = Utc::now();
        let deleted = match level {
            EntityLevel::Organization => {
                authorize(principal, Capability::MANAGE_ORGANIZATIONS, now)?;
                self.store.delete_organization(id).await?
            }
            EntityLevel::Intermediate => {
                authorize(principal, Capability::MANAGE_INTERMEDIATES, now)?;
                let current = self
                    .store
                    .find_intermediate(&IntermediateQuery::by_id(id))
                    .await?
                    .ok_or_else(|| CoreError::NotFound("Intermediate".to_string()))?;
                authorize_organization(principal, &current.organization_token)?;
                self.store.delete_intermediate(id).await?
            }
            EntityLevel::Terminal => {
                authorize(principal, Capability::MANAGE_INTERMEDIATES, now)?;
                let current = self
                    .store
                    .find_terminal(&TerminalQuery::by_id(id))
                    .await?
                    .ok_or_else(|| CoreError::NotFound("Terminal".to_string()))?;
                authorize_organization(principal, &current.organization_token)?;
                self.store.delete_terminal(id).await?
            }
        };

        if !deleted {
            return Err(CoreError::NotFound(capitalized(level)));
        }
        info!("Revoked {} {} by {}", level, id, principal.username);
        Ok(())
    }
}

fn capitalized(level: EntityLevel) -> String {
    let name = level.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Scope;
    use crate::database::models::Role;
    use crate::testing::Fixture;

    fn new_intermediate(fx: &Fixture, token: &str, name: &str, kind: IntermediateKind) -> NewIntermediate {
        NewIntermediate {
            organization_token: Some(token.to_string()),
            name: name.to_string(),
            kind,
            detail: fx.profile(),
            expiration: None,
        }
    }

    fn new_terminal(fx: &Fixture, parent: Uuid, name: &str) -> NewTerminal {
        NewTerminal { intermediate_id: parent, name: name.to_string(), detail: fx.profile(), expiration: None }
    }

    #[tokio::test]
    async fn quota_scenario_hr_alice_bob() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("abc", 5, 1).await;
        let admin = fx.principal("admin", Role::Admin, Some(&org.token)).await;
        let member = fx.principal("member", Role::Member, Some(&org.token)).await;

        let hr = services
            .lifecycle
            .issue_intermediate(&admin, new_intermediate(&fx, &org.token, "HR", IntermediateKind::Group))
            .await
            .unwrap();
        assert_eq!(hr.detail.signer_profile_name, "yourSign_test_itmd");

        let alice = services.lifecycle.issue_terminal(&member, new_terminal(&fx, hr.id, "alice")).await.unwrap();
        assert_eq!(alice.owner.username, "member");
        assert_eq!(alice.available_people, vec![alice.owner.clone()]);
        assert_eq!(services.ledger.remaining(&org.token, QuotaKind::Certificate).await.unwrap(), 0);

        let bob = services.lifecycle.issue_terminal(&member, new_terminal(&fx, hr.id, "bob")).await;
        assert!(matches!(bob, Err(CoreError::QuotaExhausted(QuotaKind::Certificate))));
        assert!(fx.store.find_terminal(&TerminalQuery::under(hr.id).named("bob")).await.unwrap().is_none());
        assert_eq!(services.ledger.remaining(&org.token, QuotaKind::Certificate).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn n_issuances_consume_n_units() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("Thaicom", 1, 10).await;
        let member = fx.principal("member", Role::Member, Some(&org.token)).await;
        let hr = fx.intermediate(&org.token, "HR", IntermediateKind::Group).await;

        for name in ["alice", "bob", "carol", "dave"] {
            services.lifecycle.issue_terminal(&member, new_terminal(&fx, hr.id, name)).await.unwrap();
        }
        assert_eq!(services.ledger.remaining(&org.token, QuotaKind::Certificate).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn second_intermediate_with_same_subject_is_duplicate() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("Thaicom", 5, 5).await;
        let admin = fx.principal("admin", Role::Admin, Some(&org.token)).await;

        let request = new_intermediate(&fx, &org.token, "HR", IntermediateKind::Group);
        services.lifecycle.issue_intermediate(&admin, request.clone()).await.unwrap();
        assert!(matches!(
            services.lifecycle.issue_intermediate(&admin, request).await,
            Err(CoreError::DuplicateSubject(_))
        ));
        // the rejected attempt did not consume signing quota
        assert_eq!(services.ledger.remaining(&org.token, QuotaKind::Signing).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn foreign_member_is_denied_before_parent_details_leak() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let ours = fx.organization("Ours", 5, 5).await;
        let theirs = fx.organization("Theirs", 5, 5).await;
        let insider = fx.principal("insider", Role::Member, Some(&theirs.token)).await;
        let outsider = fx.principal("outsider", Role::Member, Some(&ours.token)).await;
        let hr = fx.intermediate(&theirs.token, "HR", IntermediateKind::Group).await;
        let personal = fx.intermediate(&theirs.token, "Kane", IntermediateKind::Personal).await;
        services.lifecycle.issue_terminal(&insider, new_terminal(&fx, hr.id, "alice")).await.unwrap();

        for parent in [hr.id, personal.id] {
            let result = services.lifecycle.issue_terminal(&outsider, new_terminal(&fx, parent, "alice")).await;
            assert!(matches!(result, Err(CoreError::Denied(DenyReason::OutsideOrganization))), "{:?}", result);
        }
        assert_eq!(services.ledger.remaining(&theirs.token, QuotaKind::Certificate).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn expired_organization_keeps_its_certificate_quota() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization_expiring("Thaicom", Utc::now() - chrono::Duration::days(1)).await;
        let member = fx.principal("member", Role::Member, Some(&org.token)).await;
        let hr = fx.intermediate(&org.token, "HR", IntermediateKind::Group).await;

        let result = services.lifecycle.issue_terminal(&member, new_terminal(&fx, hr.id, "alice")).await;
        assert!(matches!(result, Err(CoreError::ParentInactive(EntityLevel::Organization))));
        assert_eq!(services.ledger.remaining(&org.token, QuotaKind::Certificate).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn personal_intermediate_never_issues_terminals() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("Thaicom", 5, 5).await;
        let personal = fx.intermediate(&org.token, "Kane", IntermediateKind::Personal).await;

        for (name, role) in [("m", Role::Member), ("a", Role::Admin), ("s", Role::SuperAdmin)] {
            let principal = fx.principal(name, role, Some(&org.token)).await;
            let result = services.lifecycle.issue_terminal(&principal, new_terminal(&fx, personal.id, "alice")).await;
            assert!(matches!(result, Err(CoreError::PersonalIntermediate)), "{:?}", role);
        }
    }

    #[tokio::test]
    async fn expired_super_admin_cannot_issue() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("Thaicom", 5, 5).await;
        let mut root = fx.principal("root", Role::SuperAdmin, None).await;
        root.role = Role::Expire;

        let result = services
            .lifecycle
            .issue_intermediate(&root, new_intermediate(&fx, &org.token, "HR", IntermediateKind::Group))
            .await;
        assert!(matches!(result, Err(CoreError::Denied(DenyReason::Expired))));
    }

    #[tokio::test]
    async fn concurrent_duplicate_terminals_yield_one_success() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("Thaicom", 5, 5).await;
        let member = fx.principal("member", Role::Member, Some(&org.token)).await;
        let hr = fx.intermediate(&org.token, "HR", IntermediateKind::Group).await;

        let first = services.lifecycle.issue_terminal(&member, new_terminal(&fx, hr.id, "alice"));
        let second = services.lifecycle.issue_terminal(&member, new_terminal(&fx, hr.id, "alice"));
        let (a, b) = tokio::join!(first, second);

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        assert!(matches!(a.err().or(b.err()), Some(CoreError::DuplicateSubject(_))));
        assert_eq!(services.ledger.remaining(&org.token, QuotaKind::Certificate).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn admin_is_confined_to_own_organization() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("Thaicom", 5, 5).await;
        let other = fx.organization("Other", 5, 5).await;
        let admin = fx.principal("admin", Role::Admin, Some(&org.token)).await;

        let result = services
            .lifecycle
            .issue_intermediate(&admin, new_intermediate(&fx, &other.token, "HR", IntermediateKind::Group))
            .await;
        assert!(matches!(result, Err(CoreError::Denied(DenyReason::OutsideOrganization))));

        let foreign = fx.intermediate(&other.token, "HR", IntermediateKind::Group).await;
        let member = fx.principal("member", Role::Member, Some(&org.token)).await;
        let result = services.lifecycle.issue_terminal(&member, new_terminal(&fx, foreign.id, "alice")).await;
        assert!(matches!(result, Err(CoreError::Denied(DenyReason::OutsideOrganization))));
    }

    #[tokio::test]
    async fn disabled_intermediate_cannot_be_re_enabled_or_issue() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("Thaicom", 5, 5).await;
        let admin = fx.principal("admin", Role::Admin, Some(&org.token)).await;
        let hr = fx.intermediate(&org.token, "HR", IntermediateKind::Group).await;

        let disable = IntermediatePatch { disabled: Some(true), ..Default::default() };
        assert!(services.lifecycle.update_intermediate(&admin, hr.id, disable).await.unwrap().disabled);

        let enable = IntermediatePatch { disabled: Some(false), ..Default::default() };
        assert!(matches!(
            services.lifecycle.update_intermediate(&admin, hr.id, enable).await,
            Err(CoreError::InvalidTransition(_))
        ));

        let member = fx.principal("member", Role::Member, Some(&org.token)).await;
        assert!(matches!(
            services.lifecycle.issue_terminal(&member, new_terminal(&fx, hr.id, "alice")).await,
            Err(CoreError::ParentInactive(EntityLevel::Intermediate))
        ));
    }

    #[tokio::test]
    async fn rename_collision_is_duplicate_and_signer_survives_detail_update() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("Thaicom", 5, 5).await;
        let admin = fx.principal("admin", Role::Admin, Some(&org.token)).await;
        fx.intermediate(&org.token, "HR", IntermediateKind::Group).await;
        let it = fx.intermediate(&org.token, "IT", IntermediateKind::Group).await;

        let rename = IntermediatePatch { name: Some("HR".to_string()), ..Default::default() };
        assert!(matches!(
            services.lifecycle.update_intermediate(&admin, it.id, rename).await,
            Err(CoreError::DuplicateSubject(_))
        ));

        let detail = fx.profile().with_signer("forged", "forged");
        let patch = IntermediatePatch { detail: Some(detail), ..Default::default() };
        let updated = services.lifecycle.update_intermediate(&admin, it.id, patch).await.unwrap();
        assert_eq!(updated.detail.signer_profile_name, "yourSign_test_itmd");
    }

    #[tokio::test]
    async fn terminal_update_requires_owner_or_admin() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("Thaicom", 5, 5).await;
        let owner = fx.principal("owner", Role::Member, Some(&org.token)).await;
        let peer = fx.principal("peer", Role::Member, Some(&org.token)).await;
        let admin = fx.principal("admin", Role::Admin, Some(&org.token)).await;
        let hr = fx.intermediate(&org.token, "HR", IntermediateKind::Group).await;
        let terminal = services.lifecycle.issue_terminal(&owner, new_terminal(&fx, hr.id, "alice")).await.unwrap();

        let patch = || TerminalPatch { available_people: Some(vec![peer.as_person()]), ..Default::default() };
        assert!(matches!(
            services.lifecycle.update_terminal(&peer, terminal.id, patch()).await,
            Err(CoreError::Denied(DenyReason::InsufficientRole))
        ));
        assert!(services.lifecycle.update_terminal(&owner, terminal.id, patch()).await.is_ok());
        let updated = services.lifecycle.update_terminal(&admin, terminal.id, patch()).await.unwrap();
        assert!(updated.is_shared_with(peer.id));
    }

    #[tokio::test]
    async fn revoke_does_not_cascade() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let org = fx.organization("Thaicom", 5, 5).await;
        let root = fx.principal("root", Role::SuperAdmin, None).await;
        let admin = fx.principal("admin", Role::Admin, Some(&org.token)).await;
        let hr = fx.intermediate(&org.token, "HR", IntermediateKind::Group).await;

        assert!(matches!(
            services.lifecycle.revoke(&admin, EntityLevel::Organization, org.id).await,
            Err(CoreError::Denied(DenyReason::InsufficientRole))
        ));
        services.lifecycle.revoke(&root, EntityLevel::Organization, org.id).await.unwrap();
        assert!(fx.store.find_intermediate(&IntermediateQuery::by_id(hr.id)).await.unwrap().is_some());

        services.lifecycle.revoke(&admin, EntityLevel::Intermediate, hr.id).await.unwrap();
        assert!(matches!(
            services.lifecycle.revoke(&admin, EntityLevel::Intermediate, hr.id).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn organization_issue_and_grant() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let root = fx.principal("root", Role::SuperAdmin, None).await;
        let request = NewOrganization {
            name: "Thaicom".to_string(),
            signing_quota: None,
            certificate_quota: Some(0),
            signer: SignerCredential { profile_name: "signer".to_string(), password: "pw".to_string() },
            expiration: None,
        };

        let org = services.lifecycle.issue_organization(&root, request.clone()).await.unwrap();
        assert_eq!(org.signing_quota, fx.config.quota.default_signing_quota);
        assert_eq!(org.certificate_quota_remaining, 0);
        assert!(org.token.len() >= 43);
        assert!(matches!(
            services.lifecycle.issue_organization(&root, request).await,
            Err(CoreError::DuplicateSubject(_))
        ));

        let granted = services.lifecycle.grant_quota(&root, org.id, QuotaKind::Certificate, 2).await.unwrap();
        assert_eq!(granted.certificate_quota_remaining, 2);
    }

    #[tokio::test]
    async fn token_without_signs_scope_is_denied() {
        let fx = Fixture::new().await;
        let services = fx.services();
        let mut root = fx.principal("root", Role::SuperAdmin, None).await;
        root.scopes = vec![Scope::Me];
        let result = services.lifecycle.revoke(&root, EntityLevel::Organization, Uuid::new_v4()).await;
        assert!(matches!(result, Err(CoreError::Denied(DenyReason::MissingScope))));
    }
}
