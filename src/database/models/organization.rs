use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::REDACTED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaKind {
    Signing,
    Certificate,
}

impl QuotaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaKind::Signing => "signing",
            QuotaKind::Certificate => "certificate",
        }
    }

    pub fn total_column(&self) -> &'static str {
        match self {
            QuotaKind::Signing => "signing_quota",
            QuotaKind::Certificate => "certificate_quota",
        }
    }

    pub fn remaining_column(&self) -> &'static str {
        match self {
            QuotaKind::Signing => "signing_quota_remaining",
            QuotaKind::Certificate => "certificate_quota_remaining",
        }
    }
}

impl std::fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signer identity handed down to every intermediate issued under an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerCredential {
    pub profile_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    /// Opaque scope token binding intermediates and accounts to this organization
    pub token: String,
    pub name: String,
    pub signing_quota: i64,
    pub signing_quota_remaining: i64,
    pub certificate_quota: i64,
    pub certificate_quota_remaining: i64,
    pub signer: SignerCredential,
    pub expiration: Option<DateTime<Utc>>,
    pub date: DateTime<Utc>,
}

impl Organization {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expiration.map_or(true, |exp| exp > now)
    }

    pub fn remaining(&self, kind: QuotaKind) -> i64 {
        match kind {
            QuotaKind::Signing => self.signing_quota_remaining,
            QuotaKind::Certificate => self.certificate_quota_remaining,
        }
    }

    /// Compare-and-decrement on the in-memory copy. Returns the new remaining count.
    pub fn try_reserve(&mut self, kind: QuotaKind) -> Option<i64> {
        let remaining = match kind {
            QuotaKind::Signing => &mut self.signing_quota_remaining,
            QuotaKind::Certificate => &mut self.certificate_quota_remaining,
        };
        if *remaining > 0 {
            *remaining -= 1;
            Some(*remaining)
        } else {
            None
        }
    }

    /// Raise both counters; `false` and untouched when either would overflow
    pub fn grant(&mut self, kind: QuotaKind, amount: i64) -> bool {
        let (total, remaining) = match kind {
            QuotaKind::Signing => (&mut self.signing_quota, &mut self.signing_quota_remaining),
            QuotaKind::Certificate => (&mut self.certificate_quota, &mut self.certificate_quota_remaining),
        };
        match (total.checked_add(amount), remaining.checked_add(amount)) {
            (Some(new_total), Some(new_remaining)) => {
                *total = new_total;
                *remaining = new_remaining;
                true
            }
            _ => false,
        }
    }

    /// Whether `grant(kind, amount)` would fit in the counters
    pub fn can_grant(&self, kind: QuotaKind, amount: i64) -> bool {
        let (total, remaining) = match kind {
            QuotaKind::Signing => (self.signing_quota, self.signing_quota_remaining),
            QuotaKind::Certificate => (self.certificate_quota, self.certificate_quota_remaining),
        };
        total.checked_add(amount).is_some() && remaining.checked_add(amount).is_some()
    }

    pub fn redacted(mut self) -> Self {
        self.signer.password = REDACTED.to_string();
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
    pub signer: Option<SignerCredential>,
}

impl OrganizationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.expiration.is_none() && self.signer.is_none()
    }

    pub fn apply(self, org: &mut Organization) {
        if let Some(name) = self.name {
            org.name = name;
        }
        if let Some(expiration) = self.expiration {
            org.expiration = Some(expiration);
        }
        if let Some(signer) = self.signer {
            org.signer = signer;
        }
    }
}
