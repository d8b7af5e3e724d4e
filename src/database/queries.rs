//! Typed per-collection queries.
//!
//! Each query renders to a parameterised [`Filter`] for SQL backends and can
//! evaluate itself against a record for the in-memory backend, so both
//! stores answer exactly the same predicate.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::models::{Intermediate, Organization, Terminal, User};
use crate::filter::{Filter, FilterError, SortDirection};
use crate::types::Page;

pub trait CollectionQuery {
    type Record;

    const TABLE: &'static str;

    fn to_filter(&self) -> Result<Filter, FilterError>;

    fn matches(&self, record: &Self::Record) -> bool;

    /// Filter ordered by creation date with an optional window
    fn to_listing(&self, page: Option<Page>) -> Result<Filter, FilterError> {
        let filter = self.to_filter()?.order("date", SortDirection::Asc)?;
        match page {
            Some(page) => filter.limit(page.limit, Some(page.skip)),
            None => Ok(filter),
        }
    }
}

fn eq_opt<T: PartialEq + ?Sized>(expected: Option<&T>, actual: &T) -> bool {
    expected.map_or(true, |e| e == actual)
}

fn unexpired(at: Option<DateTime<Utc>>, expiration: Option<DateTime<Utc>>) -> bool {
    match (at, expiration) {
        (Some(now), Some(exp)) => exp > now,
        _ => true,
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrincipalQuery {
    id: Option<Uuid>,
    username: Option<String>,
}

impl PrincipalQuery {
    pub fn by_id(id: Uuid) -> Self {
        Self { id: Some(id), ..Default::default() }
    }

    pub fn by_username(username: impl Into<String>) -> Self {
        Self { username: Some(username.into()), ..Default::default() }
    }
}

impl CollectionQuery for PrincipalQuery {
    type Record = User;

    const TABLE: &'static str = "users";

    fn to_filter(&self) -> Result<Filter, FilterError> {
        let mut filter = Filter::new(Self::TABLE)?;
        if let Some(id) = self.id {
            filter = filter.eq("id", id)?;
        }
        if let Some(username) = &self.username {
            filter = filter.eq("username", username.as_str())?;
        }
        Ok(filter)
    }

    fn matches(&self, user: &User) -> bool {
        eq_opt(self.id.as_ref(), &user.id)
            && eq_opt(self.username.as_deref(), user.username.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationQuery {
    id: Option<Uuid>,
    token: Option<String>,
    active_at: Option<DateTime<Utc>>,
}

impl OrganizationQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: Uuid) -> Self {
        Self { id: Some(id), ..Default::default() }
    }

    pub fn by_token(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()), ..Default::default() }
    }

    /// Restrict to organizations whose expiration lies after `now`
    pub fn active(mut self, now: DateTime<Utc>) -> Self {
        self.active_at = Some(now);
        self
    }
}

impl CollectionQuery for OrganizationQuery {
    type Record = Organization;

    const TABLE: &'static str = "organizations";

    fn to_filter(&self) -> Result<Filter, FilterError> {
        let mut filter = Filter::new(Self::TABLE)?;
        if let Some(id) = self.id {
            filter = filter.eq("id", id)?;
        }
        if let Some(token) = &self.token {
            filter = filter.eq("token", token.as_str())?;
        }
        if let Some(now) = self.active_at {
            filter = filter.not_expired("expiration", now)?;
        }
        Ok(filter)
    }

    fn matches(&self, org: &Organization) -> bool {
        eq_opt(self.id.as_ref(), &org.id)
            && eq_opt(self.token.as_deref(), org.token.as_str())
            && unexpired(self.active_at, org.expiration)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntermediateQuery {
    id: Option<Uuid>,
    organization_token: Option<String>,
    name: Option<String>,
    active_at: Option<DateTime<Utc>>,
}

impl IntermediateQuery {
    pub fn by_id(id: Uuid) -> Self {
        Self { id: Some(id), ..Default::default() }
    }

    pub fn in_organization(token: impl Into<String>) -> Self {
        Self { organization_token: Some(token.into()), ..Default::default() }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restrict to records that are neither disabled nor expired at `now`
    pub fn active(mut self, now: DateTime<Utc>) -> Self {
        self.active_at = Some(now);
        self
    }
}

impl CollectionQuery for IntermediateQuery {
    type Record = Intermediate;

    const TABLE: &'static str = "intermediates";

    fn to_filter(&self) -> Result<Filter, FilterError> {
        let mut filter = Filter::new(Self::TABLE)?;
        if let Some(id) = self.id {
            filter = filter.eq("id", id)?;
        }
        if let Some(token) = &self.organization_token {
            filter = filter.eq("organization_token", token.as_str())?;
        }
        if let Some(name) = &self.name {
            filter = filter.eq("name", name.as_str())?;
        }
        if let Some(now) = self.active_at {
            filter = filter.eq("disabled", false)?.not_expired("expiration", now)?;
        }
        Ok(filter)
    }

    fn matches(&self, record: &Intermediate) -> bool {
        eq_opt(self.id.as_ref(), &record.id)
            && eq_opt(self.organization_token.as_deref(), record.organization_token.as_str())
            && eq_opt(self.name.as_deref(), record.name.as_str())
            && self.active_at.map_or(true, |now| record.is_active(now))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TerminalQuery {
    id: Option<Uuid>,
    intermediate_id: Option<Uuid>,
    name: Option<String>,
    active_at: Option<DateTime<Utc>>,
}

impl TerminalQuery {
    pub fn by_id(id: Uuid) -> Self {
        Self { id: Some(id), ..Default::default() }
    }

    pub fn under(intermediate_id: Uuid) -> Self {
        Self { intermediate_id: Some(intermediate_id), ..Default::default() }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn active(mut self, now: DateTime<Utc>) -> Self {
        self.active_at = Some(now);
        self
    }
}

impl CollectionQuery for TerminalQuery {
    type Record = Terminal;

    const TABLE: &'static str = "terminals";

    fn to_filter(&self) -> Result<Filter, FilterError> {
        let mut filter = Filter::new(Self::TABLE)?;
        if let Some(id) = self.id {
            filter = filter.eq("id", id)?;
        }
        if let Some(parent) = self.intermediate_id {
            filter = filter.eq("intermediate_id", parent)?;
        }
        if let Some(name) = &self.name {
            filter = filter.eq("name", name.as_str())?;
        }
        if let Some(now) = self.active_at {
            filter = filter.eq("disabled", false)?.not_expired("expiration", now)?;
        }
        Ok(filter)
    }

    fn matches(&self, record: &Terminal) -> bool {
        eq_opt(self.id.as_ref(), &record.id)
            && eq_opt(self.intermediate_id.as_ref(), &record.intermediate_id)
            && eq_opt(self.name.as_deref(), record.name.as_str())
            && self.active_at.map_or(true, |now| record.is_active(now))
    }
}
