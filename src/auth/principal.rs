use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::Scope;
use crate::database::models::{Person, Role, User};

/// Authenticated caller resolved from a bearer token and its user record
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub organization_token: Option<String>,
    pub disabled: bool,
    pub expiration_date: Option<DateTime<Utc>>,
    /// Scopes granted to the token the caller presented
    pub scopes: Vec<Scope>,
}

impl Principal {
    pub fn from_user(user: User, scopes: Vec<Scope>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            organization_token: user.organization_token,
            disabled: user.disabled,
            expiration_date: user.expiration_date,
            scopes,
        }
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    /// `Expire` role or a passed expiration date
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.role == Role::Expire || self.expiration_date.map_or(false, |exp| exp <= now)
    }

    pub fn as_person(&self) -> Person {
        Person {
            uid: self.id,
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
        }
    }
}
