//! Document store contract consumed by the services.
//!
//! Every method is one atomic unit: a read-then-conditionally-write
//! (duplicate check plus insert, compare-and-decrement of a quota) happens
//! inside a single call, never across two.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{
    Intermediate, IntermediatePatch, Organization, OrganizationPatch, PrincipalPatch, QuotaKind, Terminal,
    TerminalPatch, TransactionLog, User,
};
use crate::database::queries::{IntermediateQuery, OrganizationQuery, PrincipalQuery, TerminalQuery};
use crate::filter::FilterError;
use crate::types::Page;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record in {collection}: {message}")]
    Corrupt { collection: &'static str, message: String },

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Query(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Quota unit consumed by the same atomic unit that writes a child record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDebit {
    pub organization_token: String,
    pub kind: QuotaKind,
}

impl QuotaDebit {
    pub fn new(organization_token: impl Into<String>, kind: QuotaKind) -> Self {
        Self { organization_token: organization_token.into(), kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Insertion<T> {
    Inserted(T),
    /// A record with the same uniqueness key already exists
    Duplicate,
    /// The debited quota counter was already zero
    QuotaExhausted,
    /// The organization named by the debit does not exist
    ParentMissing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modification<T> {
    Modified(T),
    NotFound,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Reserved { remaining: i64 },
    Exhausted,
    OrganizationMissing,
}

#[async_trait]
pub trait CertificateStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_principal(&self, query: &PrincipalQuery) -> Result<Option<User>, StoreError>;
    async fn insert_principal(&self, user: User) -> Result<Insertion<User>, StoreError>;
    async fn update_principal(&self, id: Uuid, patch: PrincipalPatch) -> Result<Modification<User>, StoreError>;

    async fn find_organization(&self, query: &OrganizationQuery) -> Result<Option<Organization>, StoreError>;
    async fn list_organizations(&self, query: &OrganizationQuery, page: Page)
        -> Result<Vec<Organization>, StoreError>;
    /// Fails with `Duplicate` when either the token or the name is taken
    async fn insert_organization(&self, org: Organization) -> Result<Insertion<Organization>, StoreError>;
    async fn update_organization(
        &self,
        id: Uuid,
        patch: OrganizationPatch,
    ) -> Result<Modification<Organization>, StoreError>;
    async fn delete_organization(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Decrement the remaining counter iff it is above zero
    async fn reserve_quota(&self, token: &str, kind: QuotaKind) -> Result<Reservation, StoreError>;
    /// Raise both the total and the remaining counter by `amount`. `None` when
    /// the organization is missing or either counter would overflow.
    async fn grant_quota(&self, token: &str, kind: QuotaKind, amount: i64)
        -> Result<Option<Organization>, StoreError>;

    async fn find_intermediate(&self, query: &IntermediateQuery) -> Result<Option<Intermediate>, StoreError>;
    async fn list_intermediates(&self, query: &IntermediateQuery, page: Page)
        -> Result<Vec<Intermediate>, StoreError>;
    /// Unique on `(organization_token, name)`; the optional debit commits or
    /// rolls back together with the insert
    async fn insert_intermediate(
        &self,
        record: Intermediate,
        debit: Option<QuotaDebit>,
    ) -> Result<Insertion<Intermediate>, StoreError>;
    async fn update_intermediate(
        &self,
        id: Uuid,
        patch: IntermediatePatch,
    ) -> Result<Modification<Intermediate>, StoreError>;
    async fn delete_intermediate(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn find_terminal(&self, query: &TerminalQuery) -> Result<Option<Terminal>, StoreError>;
    async fn list_terminals(&self, query: &TerminalQuery, page: Page) -> Result<Vec<Terminal>, StoreError>;
    /// Unique on `(intermediate_id, name)`
    async fn insert_terminal(
        &self,
        record: Terminal,
        debit: Option<QuotaDebit>,
    ) -> Result<Insertion<Terminal>, StoreError>;
    async fn update_terminal(&self, id: Uuid, patch: TerminalPatch) -> Result<Modification<Terminal>, StoreError>;
    async fn delete_terminal(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn append_log(&self, entry: TransactionLog) -> Result<(), StoreError>;
}
