use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{
    Intermediate, IntermediatePatch, Organization, OrganizationPatch, PrincipalPatch, QuotaKind, Terminal,
    TerminalPatch, TransactionLog, User,
};
use crate::database::queries::{
    CollectionQuery, IntermediateQuery, OrganizationQuery, PrincipalQuery, TerminalQuery,
};
use crate::database::store::{CertificateStore, Insertion, Modification, QuotaDebit, Reservation, StoreError};
use crate::types::Page;

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    organizations: Vec<Organization>,
    intermediates: Vec<Intermediate>,
    terminals: Vec<Terminal>,
    transaction_logs: Vec<TransactionLog>,
}

impl Collections {
    fn debit(&mut self, debit: &QuotaDebit) -> Reservation {
        match self.organizations.iter_mut().find(|o| o.token == debit.organization_token) {
            None => Reservation::OrganizationMissing,
            Some(org) => match org.try_reserve(debit.kind) {
                Some(remaining) => Reservation::Reserved { remaining },
                None => Reservation::Exhausted,
            },
        }
    }
}

/// Process-local store. One lock guards every collection, so each trait
/// call observes and mutates a consistent snapshot.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transaction_logs(&self) -> Vec<TransactionLog> {
        self.inner.read().await.transaction_logs.clone()
    }
}

/// Matching records ordered by creation date, then windowed
fn listing<'a, T: Clone + 'a>(
    records: impl Iterator<Item = &'a T>,
    date: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
    page: Page,
) -> Vec<T> {
    let mut out: Vec<T> = records.cloned().collect();
    out.sort_by_key(|r| date(r));
    out.into_iter()
        .skip(page.skip as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_principal(&self, query: &PrincipalQuery) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| query.matches(u)).cloned())
    }

    async fn insert_principal(&self, user: User) -> Result<Insertion<User>, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.username == user.username) {
            return Ok(Insertion::Duplicate);
        }
        inner.users.push(user.clone());
        Ok(Insertion::Inserted(user))
    }

    async fn update_principal(&self, id: Uuid, patch: PrincipalPatch) -> Result<Modification<User>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                patch.apply(user);
                Ok(Modification::Modified(user.clone()))
            }
            None => Ok(Modification::NotFound),
        }
    }

    async fn find_organization(&self, query: &OrganizationQuery) -> Result<Option<Organization>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.organizations.iter().find(|o| query.matches(o)).cloned())
    }

    async fn list_organizations(
        &self,
        query: &OrganizationQuery,
        page: Page,
    ) -> Result<Vec<Organization>, StoreError> {
        let inner = self.inner.read().await;
        Ok(listing(inner.organizations.iter().filter(|o| query.matches(o)), |o| o.date, page))
    }

    async fn insert_organization(&self, org: Organization) -> Result<Insertion<Organization>, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.organizations.iter().any(|o| o.token == org.token || o.name == org.name) {
            return Ok(Insertion::Duplicate);
        }
        inner.organizations.push(org.clone());
        Ok(Insertion::Inserted(org))
    }

    async fn update_organization(
        &self,
        id: Uuid,
        patch: OrganizationPatch,
    ) -> Result<Modification<Organization>, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(name) = &patch.name {
            if inner.organizations.iter().any(|o| o.id != id && &o.name == name) {
                return Ok(Modification::Duplicate);
            }
        }
        match inner.organizations.iter_mut().find(|o| o.id == id) {
            Some(org) => {
                patch.apply(org);
                Ok(Modification::Modified(org.clone()))
            }
            None => Ok(Modification::NotFound),
        }
    }

    async fn delete_organization(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.organizations.len();
        inner.organizations.retain(|o| o.id != id);
        Ok(inner.organizations.len() != before)
    }

    async fn reserve_quota(&self, token: &str, kind: QuotaKind) -> Result<Reservation, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.debit(&QuotaDebit::new(token, kind)))
    }

    async fn grant_quota(
        &self,
        token: &str,
        kind: QuotaKind,
        amount: i64,
    ) -> Result<Option<Organization>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .organizations
            .iter_mut()
            .find(|o| o.token == token)
            .filter(|org| org.can_grant(kind, amount))
            .map(|org| {
                org.grant(kind, amount);
                org.clone()
            }))
    }

    async fn find_intermediate(&self, query: &IntermediateQuery) -> Result<Option<Intermediate>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.intermediates.iter().find(|i| query.matches(i)).cloned())
    }

    async fn list_intermediates(
        &self,
        query: &IntermediateQuery,
        page: Page,
    ) -> Result<Vec<Intermediate>, StoreError> {
        let inner = self.inner.read().await;
        Ok(listing(inner.intermediates.iter().filter(|i| query.matches(i)), |i| i.date, page))
    }

    async fn insert_intermediate(
        &self,
        record: Intermediate,
        debit: Option<QuotaDebit>,
    ) -> Result<Insertion<Intermediate>, StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .intermediates
            .iter()
            .any(|i| i.organization_token == record.organization_token && i.name == record.name)
        {
            return Ok(Insertion::Duplicate);
        }
        if let Some(debit) = &debit {
            match inner.debit(debit) {
                Reservation::Reserved { .. } => {}
                Reservation::Exhausted => return Ok(Insertion::QuotaExhausted),
                Reservation::OrganizationMissing => return Ok(Insertion::ParentMissing),
            }
        }
        inner.intermediates.push(record.clone());
        Ok(Insertion::Inserted(record))
    }

    async fn update_intermediate(
        &self,
        id: Uuid,
        patch: IntermediatePatch,
    ) -> Result<Modification<Intermediate>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(current) = inner.intermediates.iter().find(|i| i.id == id) else {
            return Ok(Modification::NotFound);
        };
        if let Some(name) = &patch.name {
            let token = current.organization_token.clone();
            if inner
                .intermediates
                .iter()
                .any(|i| i.id != id && i.organization_token == token && &i.name == name)
            {
                return Ok(Modification::Duplicate);
            }
        }
        match inner.intermediates.iter_mut().find(|i| i.id == id) {
            Some(record) => {
                patch.apply(record);
                Ok(Modification::Modified(record.clone()))
            }
            None => Ok(Modification::NotFound),
        }
    }

    async fn delete_intermediate(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.intermediates.len();
        inner.intermediates.retain(|i| i.id != id);
        Ok(inner.intermediates.len() != before)
    }

    async fn find_terminal(&self, query: &TerminalQuery) -> Result<Option<Terminal>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.terminals.iter().find(|t| query.matches(t)).cloned())
    }

    async fn list_terminals(&self, query: &TerminalQuery, page: Page) -> Result<Vec<Terminal>, StoreError> {
        let inner = self.inner.read().await;
        Ok(listing(inner.terminals.iter().filter(|t| query.matches(t)), |t| t.date, page))
    }

    async fn insert_terminal(
        &self,
        record: Terminal,
        debit: Option<QuotaDebit>,
    ) -> Result<Insertion<Terminal>, StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .terminals
            .iter()
            .any(|t| t.intermediate_id == record.intermediate_id && t.name == record.name)
        {
            return Ok(Insertion::Duplicate);
        }
        if let Some(debit) = &debit {
            match inner.debit(debit) {
                Reservation::Reserved { .. } => {}
                Reservation::Exhausted => return Ok(Insertion::QuotaExhausted),
                Reservation::OrganizationMissing => return Ok(Insertion::ParentMissing),
            }
        }
        inner.terminals.push(record.clone());
        Ok(Insertion::Inserted(record))
    }

    async fn update_terminal(&self, id: Uuid, patch: TerminalPatch) -> Result<Modification<Terminal>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(current) = inner.terminals.iter().find(|t| t.id == id) else {
            return Ok(Modification::NotFound);
        };
        if let Some(name) = &patch.name {
            let parent = current.intermediate_id;
            if inner
                .terminals
                .iter()
                .any(|t| t.id != id && t.intermediate_id == parent && &t.name == name)
            {
                return Ok(Modification::Duplicate);
            }
        }
        match inner.terminals.iter_mut().find(|t| t.id == id) {
            Some(record) => {
                patch.apply(record);
                Ok(Modification::Modified(record.clone()))
            }
            None => Ok(Modification::NotFound),
        }
    }

    async fn delete_terminal(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.terminals.len();
        inner.terminals.retain(|t| t.id != id);
        Ok(inner.terminals.len() != before)
    }

    async fn append_log(&self, entry: TransactionLog) -> Result<(), StoreError> {
        self.inner.write().await.transaction_logs.push(entry);
        Ok(())
    }
}
