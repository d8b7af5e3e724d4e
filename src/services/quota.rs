use std::sync::Arc;
use tracing::{info, warn};

use super::error::{CoreError, CoreResult};
use crate::database::models::{Organization, QuotaKind};
use crate::database::queries::OrganizationQuery;
use crate::database::{CertificateStore, QuotaDebit, Reservation};
use crate::types::EntityLevel;

/// Signing and certificate counters per organization. Counters only move
/// through compare-and-decrement or grant statements in the store.
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn CertificateStore>,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }

    /// Take one unit; fails with `QuotaExhausted` without mutating at zero
    pub async fn reserve(&self, organization_token: &str, kind: QuotaKind) -> CoreResult<i64> {
        match self.store.reserve_quota(organization_token, kind).await? {
            Reservation::Reserved { remaining } => Ok(remaining),
            Reservation::Exhausted => {
                warn!("{} quota exhausted for organization {}", kind, organization_token);
                Err(CoreError::QuotaExhausted(kind))
            }
            Reservation::OrganizationMissing => Err(CoreError::ParentNotFound(EntityLevel::Organization)),
        }
    }

    /// Debit to hand to an insert so the unit is taken in the same atomic step
    pub fn debit(&self, organization_token: &str, kind: QuotaKind) -> QuotaDebit {
        QuotaDebit::new(organization_token, kind)
    }

    pub async fn grant(&self, organization_token: &str, kind: QuotaKind, amount: i64) -> CoreResult<Organization> {
        if amount <= 0 {
            return Err(CoreError::InvalidInput("amount must be positive".to_string()));
        }
        let Some(org) = self.store.grant_quota(organization_token, kind, amount).await? else {
            let current = self
                .store
                .find_organization(&OrganizationQuery::by_token(organization_token))
                .await?
                .ok_or_else(|| CoreError::NotFound("Organization".to_string()))?;
            warn!("Rejected {} quota grant of {} to organization {}", kind, amount, current.name);
            return Err(CoreError::InvalidInput(format!("{} quota grant of {} overflows the counter", kind, amount)));
        };
        info!("Granted {} {} quota to organization {}", amount, kind, org.name);
        Ok(org)
    }

    pub async fn remaining(&self, organization_token: &str, kind: QuotaKind) -> CoreResult<i64> {
        self.store
            .find_organization(&OrganizationQuery::by_token(organization_token))
            .await?
            .map(|org| org.remaining(kind))
            .ok_or_else(|| CoreError::NotFound("Organization".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn reserve_decrements_until_exhausted() {
        let fx = Fixture::new().await;
        let ledger = QuotaLedger::new(fx.store.clone());
        let org = fx.organization("Thaicom", 0, 2).await;

        assert_eq!(ledger.reserve(&org.token, QuotaKind::Certificate).await.unwrap(), 1);
        assert_eq!(ledger.reserve(&org.token, QuotaKind::Certificate).await.unwrap(), 0);
        assert!(matches!(
            ledger.reserve(&org.token, QuotaKind::Certificate).await,
            Err(CoreError::QuotaExhausted(QuotaKind::Certificate))
        ));
        assert_eq!(ledger.remaining(&org.token, QuotaKind::Certificate).await.unwrap(), 0);
        assert!(matches!(
            ledger.reserve(&org.token, QuotaKind::Signing).await,
            Err(CoreError::QuotaExhausted(QuotaKind::Signing))
        ));
    }

    #[tokio::test]
    async fn concurrent_reservations_never_overdraw() {
        let fx = Fixture::new().await;
        let ledger = QuotaLedger::new(fx.store.clone());
        let org = fx.organization("Thaicom", 0, 5).await;

        let attempts = (0..20).map(|_| {
            let ledger = ledger.clone();
            let token = org.token.clone();
            tokio::spawn(async move { ledger.reserve(&token, QuotaKind::Certificate).await })
        });
        let results = futures::future::join_all(attempts).await;
        let granted = results.into_iter().filter(|r| matches!(r, Ok(Ok(_)))).count();

        assert_eq!(granted, 5);
        assert_eq!(ledger.remaining(&org.token, QuotaKind::Certificate).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn grant_requires_positive_amount_and_known_organization() {
        let fx = Fixture::new().await;
        let ledger = QuotaLedger::new(fx.store.clone());
        let org = fx.organization("Thaicom", 1, 0).await;

        assert!(matches!(ledger.grant(&org.token, QuotaKind::Certificate, 0).await, Err(CoreError::InvalidInput(_))));
        assert!(matches!(ledger.grant("nope", QuotaKind::Certificate, 1).await, Err(CoreError::NotFound(_))));

        let updated = ledger.grant(&org.token, QuotaKind::Certificate, 3).await.unwrap();
        assert_eq!(updated.certificate_quota, 3);
        assert_eq!(updated.certificate_quota_remaining, 3);
    }

    #[tokio::test]
    async fn grant_that_would_overflow_is_rejected_untouched() {
        let fx = Fixture::new().await;
        let ledger = QuotaLedger::new(fx.store.clone());
        let org = fx.organization("Thaicom", 1, 5).await;

        assert!(matches!(
            ledger.grant(&org.token, QuotaKind::Certificate, i64::MAX).await,
            Err(CoreError::InvalidInput(_))
        ));
        assert_eq!(ledger.remaining(&org.token, QuotaKind::Certificate).await.unwrap(), 5);

        // the largest amount that still fits goes through
        let updated = ledger.grant(&org.token, QuotaKind::Certificate, i64::MAX - 5).await.unwrap();
        assert_eq!(updated.certificate_quota_remaining, i64::MAX);
    }

    #[tokio::test]
    async fn reserve_against_missing_organization() {
        let fx = Fixture::new().await;
        let ledger = QuotaLedger::new(fx.store.clone());
        assert!(matches!(
            ledger.reserve("ghost", QuotaKind::Signing).await,
            Err(CoreError::ParentNotFound(EntityLevel::Organization))
        ));
    }
}
