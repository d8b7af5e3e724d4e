use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CertificateProfile;

/// A person a terminal certificate is issued to or shared with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub uid: Uuid,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terminal {
    pub id: Uuid,
    pub intermediate_id: Uuid,
    /// Copied from the parent intermediate at issuance
    pub organization_token: String,
    pub name: String,
    pub owner: Person,
    pub available_people: Vec<Person>,
    pub detail: CertificateProfile,
    pub expiration: Option<DateTime<Utc>>,
    pub disabled: bool,
    pub date: DateTime<Utc>,
}

impl Terminal {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.disabled && self.expiration.map_or(true, |exp| exp > now)
    }

    pub fn is_shared_with(&self, uid: Uuid) -> bool {
        self.owner.uid == uid || self.available_people.iter().any(|p| p.uid == uid)
    }

    pub fn redacted(mut self) -> Self {
        self.detail = self.detail.redacted();
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TerminalPatch {
    pub name: Option<String>,
    pub detail: Option<CertificateProfile>,
    pub available_people: Option<Vec<Person>>,
    pub expiration: Option<DateTime<Utc>>,
    pub disabled: Option<bool>,
}

impl TerminalPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.detail.is_none()
            && self.available_people.is_none()
            && self.expiration.is_none()
            && self.disabled.is_none()
    }

    pub fn apply(self, terminal: &mut Terminal) {
        if let Some(name) = self.name {
            terminal.name = name;
        }
        if let Some(detail) = self.detail {
            let signer_name = terminal.detail.signer_profile_name.clone();
            let signer_password = terminal.detail.signer_password.clone();
            terminal.detail = detail.with_signer(&signer_name, &signer_password);
        }
        if let Some(people) = self.available_people {
            terminal.available_people = people;
        }
        if let Some(expiration) = self.expiration {
            terminal.expiration = Some(expiration);
        }
        if let Some(disabled) = self.disabled {
            terminal.disabled = disabled;
        }
    }
}
