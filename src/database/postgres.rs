use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::database::models::{
    CertificateProfile, Intermediate, IntermediatePatch, Organization, OrganizationPatch, Person, PrincipalPatch,
    QuotaKind, SignerCredential, Terminal, TerminalPatch, TransactionLog, User,
};
use crate::database::queries::{IntermediateQuery, OrganizationQuery, PrincipalQuery, TerminalQuery};
use crate::database::repository::Repository;
use crate::database::store::{CertificateStore, Insertion, Modification, QuotaDebit, Reservation, StoreError};
use crate::types::Page;

#[derive(Debug, FromRow)]
pub struct UserRow {
    id: Uuid,
    username: String,
    hashed_password: String,
    email: Option<String>,
    full_name: Option<String>,
    role: String,
    organization_token: Option<String>,
    disabled: bool,
    expiration_date: Option<DateTime<Utc>>,
    date: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse()
            .map_err(|message| StoreError::Corrupt { collection: "users", message })?;
        Ok(User {
            id: row.id,
            username: row.username,
            hashed_password: row.hashed_password,
            email: row.email,
            full_name: row.full_name,
            role,
            organization_token: row.organization_token,
            disabled: row.disabled,
            expiration_date: row.expiration_date,
            date: row.date,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct OrganizationRow {
    id: Uuid,
    token: String,
    name: String,
    signing_quota: i64,
    signing_quota_remaining: i64,
    certificate_quota: i64,
    certificate_quota_remaining: i64,
    signer_profile_name: String,
    signer_password: String,
    expiration: Option<DateTime<Utc>>,
    date: DateTime<Utc>,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = StoreError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        Ok(Organization {
            id: row.id,
            token: row.token,
            name: row.name,
            signing_quota: row.signing_quota,
            signing_quota_remaining: row.signing_quota_remaining,
            certificate_quota: row.certificate_quota,
            certificate_quota_remaining: row.certificate_quota_remaining,
            signer: SignerCredential {
                profile_name: row.signer_profile_name,
                password: row.signer_password,
            },
            expiration: row.expiration,
            date: row.date,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct IntermediateRow {
    id: Uuid,
    organization_token: String,
    name: String,
    kind: String,
    detail: Json<CertificateProfile>,
    expiration: Option<DateTime<Utc>>,
    disabled: bool,
    date: DateTime<Utc>,
}

impl TryFrom<IntermediateRow> for Intermediate {
    type Error = StoreError;

    fn try_from(row: IntermediateRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse()
            .map_err(|message| StoreError::Corrupt { collection: "intermediates", message })?;
        Ok(Intermediate {
            id: row.id,
            organization_token: row.organization_token,
            name: row.name,
            kind,
            detail: row.detail.0,
            expiration: row.expiration,
            disabled: row.disabled,
            date: row.date,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct TerminalRow {
    id: Uuid,
    intermediate_id: Uuid,
    organization_token: String,
    name: String,
    owner: Json<Person>,
    available_people: Json<Vec<Person>>,
    detail: Json<CertificateProfile>,
    expiration: Option<DateTime<Utc>>,
    disabled: bool,
    date: DateTime<Utc>,
}

impl TryFrom<TerminalRow> for Terminal {
    type Error = StoreError;

    fn try_from(row: TerminalRow) -> Result<Self, Self::Error> {
        Ok(Terminal {
            id: row.id,
            intermediate_id: row.intermediate_id,
            organization_token: row.organization_token,
            name: row.name,
            owner: row.owner.0,
            available_people: row.available_people.0,
            detail: row.detail.0,
            expiration: row.expiration,
            disabled: row.disabled,
            date: row.date,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Maps an `UPDATE ... RETURNING *` result onto the modification outcome
fn modification<R, T>(result: Result<Option<R>, sqlx::Error>) -> Result<Modification<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    match result {
        Ok(Some(row)) => Ok(Modification::Modified(T::try_from(row)?)),
        Ok(None) => Ok(Modification::NotFound),
        Err(err) if is_unique_violation(&err) => Ok(Modification::Duplicate),
        Err(err) => Err(err.into()),
    }
}

/// Compare-and-decrement inside the caller's connection or transaction
async fn reserve_in(conn: &mut PgConnection, debit: &QuotaDebit) -> Result<Reservation, StoreError> {
    let column = debit.kind.remaining_column();
    let sql = format!(
        "UPDATE organizations SET {0} = {0} - 1 WHERE token = $1 AND {0} > 0 RETURNING {0}",
        column
    );
    let remaining: Option<i64> = sqlx::query_scalar(&sql)
        .bind(&debit.organization_token)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(remaining) = remaining {
        return Ok(Reservation::Reserved { remaining });
    }

    let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM organizations WHERE token = $1")
        .bind(&debit.organization_token)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(if exists.is_some() { Reservation::Exhausted } else { Reservation::OrganizationMissing })
}

/// Postgres-backed document store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs `insert` and the optional debit as one transaction. The insert
    /// goes first so a duplicate never consumes quota.
    async fn insert_with_debit<R, T>(
        &self,
        insert: sqlx::query::QueryAs<'_, sqlx::Postgres, R, sqlx::postgres::PgArguments>,
        debit: Option<QuotaDebit>,
    ) -> Result<Insertion<T>, StoreError>
    where
        R: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
        T: TryFrom<R, Error = StoreError>,
    {
        let mut tx = self.pool.begin().await?;

        let Some(row) = insert.fetch_optional(&mut *tx).await? else {
            tx.rollback().await?;
            return Ok(Insertion::Duplicate);
        };

        if let Some(debit) = &debit {
            match reserve_in(&mut *tx, debit).await? {
                Reservation::Reserved { remaining } => {
                    debug!("Reserved {} quota of {}, {} left", debit.kind, debit.organization_token, remaining);
                }
                Reservation::Exhausted => {
                    tx.rollback().await?;
                    return Ok(Insertion::QuotaExhausted);
                }
                Reservation::OrganizationMissing => {
                    tx.rollback().await?;
                    return Ok(Insertion::ParentMissing);
                }
            }
        }

        tx.commit().await?;
        Ok(Insertion::Inserted(T::try_from(row)?))
    }
}

#[async_trait]
impl CertificateStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_principal(&self, query: &PrincipalQuery) -> Result<Option<User>, StoreError> {
        Repository::<UserRow>::new(self.pool.clone()).select_one(query).await
    }

    async fn insert_principal(&self, user: User) -> Result<Insertion<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, username, hashed_password, email, full_name, role, organization_token, \
             disabled, expiration_date, date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (username) DO NOTHING RETURNING *",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&user.organization_token)
        .bind(user.disabled)
        .bind(user.expiration_date)
        .bind(user.date)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Insertion::Inserted(User::try_from(row)?)),
            None => Ok(Insertion::Duplicate),
        }
    }

    async fn update_principal(&self, id: Uuid, patch: PrincipalPatch) -> Result<Modification<User>, StoreError> {
        let result = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET email = COALESCE($2, email), full_name = COALESCE($3, full_name), \
             role = COALESCE($4, role), disabled = COALESCE($5, disabled), \
             organization_token = COALESCE($6, organization_token), \
             expiration_date = COALESCE($7, expiration_date) WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(patch.email)
        .bind(patch.full_name)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.disabled)
        .bind(patch.organization_token)
        .bind(patch.expiration_date)
        .fetch_optional(&self.pool)
        .await;
        modification(result)
    }

    async fn find_organization(&self, query: &OrganizationQuery) -> Result<Option<Organization>, StoreError> {
        Repository::<OrganizationRow>::new(self.pool.clone()).select_one(query).await
    }

    async fn list_organizations(
        &self,
        query: &OrganizationQuery,
        page: Page,
    ) -> Result<Vec<Organization>, StoreError> {
        Repository::<OrganizationRow>::new(self.pool.clone()).select_any(query, page).await
    }

    async fn insert_organization(&self, org: Organization) -> Result<Insertion<Organization>, StoreError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "INSERT INTO organizations (id, token, name, signing_quota, signing_quota_remaining, \
             certificate_quota, certificate_quota_remaining, signer_profile_name, signer_password, \
             expiration, date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT DO NOTHING RETURNING *",
        )
        .bind(org.id)
        .bind(&org.token)
        .bind(&org.name)
        .bind(org.signing_quota)
        .bind(org.signing_quota_remaining)
        .bind(org.certificate_quota)
        .bind(org.certificate_quota_remaining)
        .bind(&org.signer.profile_name)
        .bind(&org.signer.password)
        .bind(org.expiration)
        .bind(org.date)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Insertion::Inserted(Organization::try_from(row)?)),
            None => Ok(Insertion::Duplicate),
        }
    }

    async fn update_organization(
        &self,
        id: Uuid,
        patch: OrganizationPatch,
    ) -> Result<Modification<Organization>, StoreError> {
        let (signer_name, signer_password) = match patch.signer {
            Some(signer) => (Some(signer.profile_name), Some(signer.password)),
            None => (None, None),
        };
        let result = sqlx::query_as::<_, OrganizationRow>(
            "UPDATE organizations SET name = COALESCE($2, name), expiration = COALESCE($3, expiration), \
             signer_profile_name = COALESCE($4, signer_profile_name), \
             signer_password = COALESCE($5, signer_password) WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.expiration)
        .bind(signer_name)
        .bind(signer_password)
        .fetch_optional(&self.pool)
        .await;
        modification(result)
    }

    async fn delete_organization(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reserve_quota(&self, token: &str, kind: QuotaKind) -> Result<Reservation, StoreError> {
        let mut conn = self.pool.acquire().await?;
        reserve_in(&mut *conn, &QuotaDebit::new(token, kind)).await
    }

    async fn grant_quota(
        &self,
        token: &str,
        kind: QuotaKind,
        amount: i64,
    ) -> Result<Option<Organization>, StoreError> {
        let sql = format!(
            "UPDATE organizations SET {0} = {0} + $2, {1} = {1} + $2 \
             WHERE token = $1 AND {0} <= $3 - $2 AND {1} <= $3 - $2 RETURNING *",
            kind.total_column(),
            kind.remaining_column()
        );
        sqlx::query_as::<_, OrganizationRow>(&sql)
            .bind(token)
            .bind(amount)
            .bind(i64::MAX)
            .fetch_optional(&self.pool)
            .await?
            .map(Organization::try_from)
            .transpose()
    }

    async fn find_intermediate(&self, query: &IntermediateQuery) -> Result<Option<Intermediate>, StoreError> {
        Repository::<IntermediateRow>::new(self.pool.clone()).select_one(query).await
    }

    async fn list_intermediates(
        &self,
        query: &IntermediateQuery,
        page: Page,
    ) -> Result<Vec<Intermediate>, StoreError> {
        Repository::<IntermediateRow>::new(self.pool.clone()).select_any(query, page).await
    }

    async fn insert_intermediate(
        &self,
        record: Intermediate,
        debit: Option<QuotaDebit>,
    ) -> Result<Insertion<Intermediate>, StoreError> {
        let insert = sqlx::query_as::<_, IntermediateRow>(
            "INSERT INTO intermediates (id, organization_token, name, kind, detail, expiration, disabled, date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (organization_token, name) DO NOTHING RETURNING *",
        )
        .bind(record.id)
        .bind(record.organization_token)
        .bind(record.name)
        .bind(record.kind.as_str())
        .bind(Json(record.detail))
        .bind(record.expiration)
        .bind(record.disabled)
        .bind(record.date);
        self.insert_with_debit(insert, debit).await
    }

    async fn update_intermediate(
        &self,
        id: Uuid,
        patch: IntermediatePatch,
    ) -> Result<Modification<Intermediate>, StoreError> {
        let result = sqlx::query_as::<_, IntermediateRow>(
            "UPDATE intermediates SET name = COALESCE($2, name), detail = COALESCE($3, detail), \
             expiration = COALESCE($4, expiration), disabled = COALESCE($5, disabled) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.detail.map(Json))
        .bind(patch.expiration)
        .bind(patch.disabled)
        .fetch_optional(&self.pool)
        .await;
        modification(result)
    }

    async fn delete_intermediate(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM intermediates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_terminal(&self, query: &TerminalQuery) -> Result<Option<Terminal>, StoreError> {
        Repository::<TerminalRow>::new(self.pool.clone()).select_one(query).await
    }

    async fn list_terminals(&self, query: &TerminalQuery, page: Page) -> Result<Vec<Terminal>, StoreError> {
        Repository::<TerminalRow>::new(self.pool.clone()).select_any(query, page).await
    }

    async fn insert_terminal(
        &self,
        record: Terminal,
        debit: Option<QuotaDebit>,
    ) -> Result<Insertion<Terminal>, StoreError> {
        let insert = sqlx::query_as::<_, TerminalRow>(
            "INSERT INTO terminals (id, intermediate_id, organization_token, name, owner, available_people, \
             detail, expiration, disabled, date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (intermediate_id, name) DO NOTHING RETURNING *",
        )
        .bind(record.id)
        .bind(record.intermediate_id)
        .bind(record.organization_token)
        .bind(record.name)
        .bind(Json(record.owner))
        .bind(Json(record.available_people))
        .bind(Json(record.detail))
        .bind(record.expiration)
        .bind(record.disabled)
        .bind(record.date);
        self.insert_with_debit(insert, debit).await
    }

    async fn update_terminal(&self, id: Uuid, patch: TerminalPatch) -> Result<Modification<Terminal>, StoreError> {
        let result = sqlx::query_as::<_, TerminalRow>(
            "UPDATE terminals SET name = COALESCE($2, name), detail = COALESCE($3, detail), \
             available_people = COALESCE($4, available_people), expiration = COALESCE($5, expiration), \
             disabled = COALESCE($6, disabled) WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.detail.map(Json))
        .bind(patch.available_people.map(Json))
        .bind(patch.expiration)
        .bind(patch.disabled)
        .fetch_optional(&self.pool)
        .await;
        modification(result)
    }

    async fn delete_terminal(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM terminals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_log(&self, entry: TransactionLog) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO transaction_logs (id, method, endpoint, operation, payload, info_user, datetime) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.method)
        .bind(entry.endpoint)
        .bind(entry.operation)
        .bind(entry.payload)
        .bind(entry.info_user)
        .bind(entry.datetime)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
