use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Stored role. `Expire` is a sentinel for lapsed accounts, not a privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Member,
    Admin,
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    Expire,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "Member",
            Role::Admin => "Admin",
            Role::SuperAdmin => "Super Admin",
            Role::Expire => "Expire",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Member" => Ok(Role::Member),
            "Admin" => Ok(Role::Admin),
            "Super Admin" => Ok(Role::SuperAdmin),
            "Expire" => Ok(Role::Expire),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Account record in the `users` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Role,
    /// Scope token of the organization this account acts for
    pub organization_token: Option<String>,
    pub disabled: bool,
    pub expiration_date: Option<DateTime<Utc>>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrincipalPatch {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub disabled: Option<bool>,
    #[serde(alias = "channel_access_token")]
    pub organization_token: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl PrincipalPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.role.is_none()
            && self.disabled.is_none()
            && self.organization_token.is_none()
            && self.expiration_date.is_none()
    }

    pub fn apply(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = Some(email);
        }
        if let Some(full_name) = self.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(disabled) = self.disabled {
            user.disabled = disabled;
        }
        if let Some(token) = self.organization_token {
            user.organization_token = Some(token);
        }
        if let Some(expiration) = self.expiration_date {
            user.expiration_date = Some(expiration);
        }
    }
}
