use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::error::{CoreError, CoreResult};
use crate::database::models::{Intermediate, IntermediateKind, Organization, QuotaKind};
use crate::database::queries::{IntermediateQuery, OrganizationQuery, TerminalQuery};
use crate::database::{CertificateStore, Insertion};
use crate::types::EntityLevel;

/// Parent-existence and uniqueness rules of the three-level hierarchy.
///
/// The `validate_*` checks give early, descriptive failures. The store's
/// atomic insert is what actually guarantees uniqueness under concurrency;
/// [`HierarchyValidator::settle`] turns its outcome into the same errors.
#[derive(Clone)]
pub struct HierarchyValidator {
    store: Arc<dyn CertificateStore>,
}

impl HierarchyValidator {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }

    pub async fn validate_intermediate_creation(
        &self,
        organization_token: &str,
        subject: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Organization> {
        let org = self
            .store
            .find_organization(&OrganizationQuery::by_token(organization_token))
            .await?
            .ok_or(CoreError::ParentNotFound(EntityLevel::Organization))?;
        if !org.is_active(now) {
            return Err(CoreError::ParentInactive(EntityLevel::Organization));
        }

        let sibling = IntermediateQuery::in_organization(organization_token).named(subject);
        if self.store.find_intermediate(&sibling).await?.is_some() {
            return Err(duplicate(EntityLevel::Intermediate, subject));
        }

        debug!("Intermediate '{}' may be created under organization {}", subject, org.name);
        Ok(org)
    }

    /// Existing intermediate a terminal would be issued under
    pub async fn terminal_parent(&self, intermediate_id: Uuid) -> CoreResult<Intermediate> {
        self.store
            .find_intermediate(&IntermediateQuery::by_id(intermediate_id))
            .await?
            .ok_or(CoreError::ParentNotFound(EntityLevel::Intermediate))
    }

    /// Kind, activity and uniqueness checks for a terminal under `parent`.
    /// The owning organization must be active as well, it pays the quota.
    pub async fn validate_terminal_creation(
        &self,
        parent: &Intermediate,
        subject: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if parent.kind != IntermediateKind::Group {
            return Err(CoreError::PersonalIntermediate);
        }
        if !parent.is_active(now) {
            return Err(CoreError::ParentInactive(EntityLevel::Intermediate));
        }
        let org = self
            .store
            .find_organization(&OrganizationQuery::by_token(&parent.organization_token))
            .await?
            .ok_or(CoreError::ParentNotFound(EntityLevel::Organization))?;
        if !org.is_active(now) {
            return Err(CoreError::ParentInactive(EntityLevel::Organization));
        }

        let sibling = TerminalQuery::under(parent.id).named(subject);
        if self.store.find_terminal(&sibling).await?.is_some() {
            return Err(duplicate(EntityLevel::Terminal, subject));
        }

        debug!("Terminal '{}' may be created under intermediate {}", subject, parent.name);
        Ok(())
    }

    /// Map the outcome of an atomic insert-with-debit onto the error taxonomy
    pub fn settle<T>(
        &self,
        outcome: Insertion<T>,
        level: EntityLevel,
        subject: &str,
        quota: QuotaKind,
    ) -> CoreResult<T> {
        match outcome {
            Insertion::Inserted(record) => Ok(record),
            Insertion::Duplicate => Err(duplicate(level, subject)),
            Insertion::QuotaExhausted => Err(CoreError::QuotaExhausted(quota)),
            Insertion::ParentMissing => Err(CoreError::ParentNotFound(EntityLevel::Organization)),
        }
    }
}

pub(crate) fn duplicate(level: EntityLevel, subject: &str) -> CoreError {
    CoreError::DuplicateSubject(format!("{} '{}'", level, subject))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn intermediate_requires_existing_active_organization() {
        let fx = Fixture::new().await;
        let validator = HierarchyValidator::new(fx.store.clone());
        let now = Utc::now();

        assert!(matches!(
            validator.validate_intermediate_creation("missing", "HR", now).await,
            Err(CoreError::ParentNotFound(EntityLevel::Organization))
        ));

        let expired = fx.organization_expiring("Old Corp", now - chrono::Duration::days(1)).await;
        assert!(matches!(
            validator.validate_intermediate_creation(&expired.token, "HR", now).await,
            Err(CoreError::ParentInactive(EntityLevel::Organization))
        ));

        let org = fx.organization("Thaicom", 5, 5).await;
        assert!(validator.validate_intermediate_creation(&org.token, "HR", now).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_subject_within_organization_is_rejected() {
        let fx = Fixture::new().await;
        let validator = HierarchyValidator::new(fx.store.clone());
        let org = fx.organization("Thaicom", 5, 5).await;
        let other = fx.organization("Other", 5, 5).await;
        fx.intermediate(&org.token, "HR", IntermediateKind::Group).await;

        assert!(matches!(
            validator.validate_intermediate_creation(&org.token, "HR", Utc::now()).await,
            Err(CoreError::DuplicateSubject(_))
        ));
        // same subject in another organization is fine
        assert!(validator.validate_intermediate_creation(&other.token, "HR", Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn terminal_parent_must_be_an_active_group() {
        let fx = Fixture::new().await;
        let validator = HierarchyValidator::new(fx.store.clone());
        let org = fx.organization("Thaicom", 5, 5).await;
        let personal = fx.intermediate(&org.token, "Kane", IntermediateKind::Personal).await;
        let group = fx.intermediate(&org.token, "HR", IntermediateKind::Group).await;
        let now = Utc::now();

        assert!(matches!(
            validator.terminal_parent(Uuid::new_v4()).await,
            Err(CoreError::ParentNotFound(EntityLevel::Intermediate))
        ));
        let personal = validator.terminal_parent(personal.id).await.unwrap();
        assert!(matches!(
            validator.validate_terminal_creation(&personal, "alice", now).await,
            Err(CoreError::PersonalIntermediate)
        ));
        let group = validator.terminal_parent(group.id).await.unwrap();
        assert!(validator.validate_terminal_creation(&group, "alice", now).await.is_ok());
    }

    #[tokio::test]
    async fn expired_organization_blocks_terminals_under_active_group() {
        let fx = Fixture::new().await;
        let validator = HierarchyValidator::new(fx.store.clone());
        let now = Utc::now();
        let expired = fx.organization_expiring("Thaicom", now - chrono::Duration::days(1)).await;
        let hr = fx.intermediate(&expired.token, "HR", IntermediateKind::Group).await;
        assert!(hr.is_active(now));

        assert!(matches!(
            validator.validate_terminal_creation(&hr, "alice", now).await,
            Err(CoreError::ParentInactive(EntityLevel::Organization))
        ));
    }

    #[test]
    fn settle_maps_store_outcomes() {
        let store: Arc<dyn CertificateStore> = Arc::new(crate::database::MemoryStore::new());
        let validator = HierarchyValidator::new(store);
        let level = EntityLevel::Terminal;
        assert_eq!(validator.settle(Insertion::Inserted(7), level, "a", QuotaKind::Certificate).unwrap(), 7);
        assert!(matches!(
            validator.settle::<()>(Insertion::Duplicate, level, "a", QuotaKind::Certificate),
            Err(CoreError::DuplicateSubject(_))
        ));
        assert!(matches!(
            validator.settle::<()>(Insertion::QuotaExhausted, level, "a", QuotaKind::Certificate),
            Err(CoreError::QuotaExhausted(QuotaKind::Certificate))
        ));
        assert!(matches!(
            validator.settle::<()>(Insertion::ParentMissing, level, "a", QuotaKind::Certificate),
            Err(CoreError::ParentNotFound(EntityLevel::Organization))
        ));
    }
}
