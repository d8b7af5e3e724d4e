//! Role policy evaluation.
//!
//! Every endpoint asks the same question through [`evaluate`]: may this
//! principal exercise this capability right now? Denials carry a reason the
//! HTTP layer maps to a status code.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Principal, Scope};
use crate::database::models::Role;

/// Privilege levels, least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Privilege {
    Member,
    Admin,
    SuperAdmin,
}

impl Privilege {
    /// Rank of a stored role. `Expire` keeps only member rank; expiry
    /// itself is judged separately.
    pub fn of(role: Role) -> Self {
        match role {
            Role::Member | Role::Expire => Privilege::Member,
            Role::Admin => Privilege::Admin,
            Role::SuperAdmin => Privilege::SuperAdmin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub privilege: Privilege,
    pub scope: Scope,
}

impl Capability {
    pub const READ_PROFILE: Capability = Capability { privilege: Privilege::Member, scope: Scope::Me };
    pub const MANAGE_MEMBERS: Capability = Capability { privilege: Privilege::Admin, scope: Scope::Me };
    pub const USE_TERMINALS: Capability = Capability { privilege: Privilege::Member, scope: Scope::Signs };
    pub const MANAGE_INTERMEDIATES: Capability = Capability { privilege: Privilege::Admin, scope: Scope::Signs };
    pub const MANAGE_ORGANIZATIONS: Capability =
        Capability { privilege: Privilege::SuperAdmin, scope: Scope::Signs };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    MissingScope,
    Disabled,
    Expired,
    InsufficientRole,
    OutsideOrganization,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::MissingScope => "Not enough permissions",
            DenyReason::Disabled => "Inactive user",
            DenyReason::Expired => "Please contact admin service.",
            DenyReason::InsufficientRole => "Not enough to access.",
            DenyReason::OutsideOrganization => "Resource belongs to another organization",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Checks run in a fixed order: scope, disabled, expiry (signing scope
/// only), then privilege ordering.
pub fn evaluate(principal: &Principal, capability: Capability, now: DateTime<Utc>) -> Decision {
    if !principal.has_scope(capability.scope) {
        return Decision::Deny(DenyReason::MissingScope);
    }
    if principal.disabled {
        return Decision::Deny(DenyReason::Disabled);
    }
    if capability.scope == Scope::Signs && principal.is_expired(now) {
        return Decision::Deny(DenyReason::Expired);
    }
    if Privilege::of(principal.role) < capability.privilege {
        return Decision::Deny(DenyReason::InsufficientRole);
    }
    Decision::Allow
}

/// Super Admins act across organizations; everyone else only inside their own.
pub fn within_organization(principal: &Principal, organization_token: &str) -> Decision {
    if principal.role == Role::SuperAdmin || principal.organization_token.as_deref() == Some(organization_token) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::OutsideOrganization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn principal(role: Role, scopes: Vec<Scope>) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            username: "kane".to_string(),
            full_name: None,
            email: None,
            role,
            organization_token: Some("abc".to_string()),
            disabled: false,
            expiration_date: None,
            scopes,
        }
    }

    #[test]
    fn ordering_is_member_admin_super_admin() {
        let now = Utc::now();
        let admin = principal(Role::Admin, Scope::ALL.to_vec());
        assert!(evaluate(&admin, Capability::USE_TERMINALS, now).is_allowed());
        assert!(evaluate(&admin, Capability::MANAGE_INTERMEDIATES, now).is_allowed());
        assert_eq!(
            evaluate(&admin, Capability::MANAGE_ORGANIZATIONS, now),
            Decision::Deny(DenyReason::InsufficientRole)
        );

        let member = principal(Role::Member, Scope::ALL.to_vec());
        assert_eq!(
            evaluate(&member, Capability::MANAGE_INTERMEDIATES, now),
            Decision::Deny(DenyReason::InsufficientRole)
        );
    }

    #[test]
    fn expire_role_is_denied_every_signing_capability() {
        let now = Utc::now();
        let expired = principal(Role::Expire, Scope::ALL.to_vec());
        for capability in [
            Capability::USE_TERMINALS,
            Capability::MANAGE_INTERMEDIATES,
            Capability::MANAGE_ORGANIZATIONS,
        ] {
            assert_eq!(evaluate(&expired, capability, now), Decision::Deny(DenyReason::Expired));
        }
        // profile reads are not signing-scoped
        assert!(evaluate(&expired, Capability::READ_PROFILE, now).is_allowed());
    }

    #[test]
    fn lapsed_super_admin_is_denied_as_expired() {
        let now = Utc::now();
        let mut admin = principal(Role::SuperAdmin, Scope::ALL.to_vec());
        admin.expiration_date = Some(now - chrono::Duration::seconds(1));
        assert_eq!(
            evaluate(&admin, Capability::MANAGE_ORGANIZATIONS, now),
            Decision::Deny(DenyReason::Expired)
        );
    }

    #[test]
    fn disabled_and_scope_are_checked_first() {
        let now = Utc::now();
        let mut member = principal(Role::SuperAdmin, vec![Scope::Me]);
        assert_eq!(
            evaluate(&member, Capability::USE_TERMINALS, now),
            Decision::Deny(DenyReason::MissingScope)
        );
        member.scopes = Scope::ALL.to_vec();
        member.disabled = true;
        assert_eq!(evaluate(&member, Capability::USE_TERMINALS, now), Decision::Deny(DenyReason::Disabled));
    }

    #[test]
    fn organization_boundary() {
        let admin = principal(Role::Admin, Scope::ALL.to_vec());
        assert!(within_organization(&admin, "abc").is_allowed());
        assert_eq!(within_organization(&admin, "xyz"), Decision::Deny(DenyReason::OutsideOrganization));
        let root = principal(Role::SuperAdmin, Scope::ALL.to_vec());
        assert!(within_organization(&root, "xyz").is_allowed());
    }
}
