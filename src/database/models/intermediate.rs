use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::CertificateProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntermediateKind {
    /// Holds a single personal certificate; never issues terminals
    Personal,
    Group,
}

impl IntermediateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntermediateKind::Personal => "personal",
            IntermediateKind::Group => "group",
        }
    }
}

impl FromStr for IntermediateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(IntermediateKind::Personal),
            "group" => Ok(IntermediateKind::Group),
            other => Err(format!("unknown intermediate type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intermediate {
    pub id: Uuid,
    pub organization_token: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IntermediateKind,
    pub detail: CertificateProfile,
    pub expiration: Option<DateTime<Utc>>,
    pub disabled: bool,
    pub date: DateTime<Utc>,
}

impl Intermediate {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.disabled && self.expiration.map_or(true, |exp| exp > now)
    }

    pub fn redacted(mut self) -> Self {
        self.detail = self.detail.redacted();
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntermediatePatch {
    pub name: Option<String>,
    pub detail: Option<CertificateProfile>,
    pub expiration: Option<DateTime<Utc>>,
    pub disabled: Option<bool>,
}

impl IntermediatePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.detail.is_none() && self.expiration.is_none() && self.disabled.is_none()
    }

    /// Signer fields of a replacement detail stay those of the current record.
    pub fn apply(self, intermediate: &mut Intermediate) {
        if let Some(name) = self.name {
            intermediate.name = name;
        }
        if let Some(detail) = self.detail {
            let signer_name = intermediate.detail.signer_profile_name.clone();
            let signer_password = intermediate.detail.signer_password.clone();
            intermediate.detail = detail.with_signer(&signer_name, &signer_password);
        }
        if let Some(expiration) = self.expiration {
            intermediate.expiration = Some(expiration);
        }
        if let Some(disabled) = self.disabled {
            intermediate.disabled = disabled;
        }
    }
}
