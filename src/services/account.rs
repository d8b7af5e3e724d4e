use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{CoreError, CoreResult};
use super::naming;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{evaluate, within_organization, Capability, DenyReason, JwtKeys, Principal, Privilege, Scope};
use crate::database::models::{PrincipalPatch, Role, User};
use crate::database::queries::PrincipalQuery;
use crate::database::{CertificateStore, Insertion, Modification};

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

fn validate_email(email: &str) -> CoreResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => Ok(()),
        _ => Err(CoreError::InvalidInput(format!("Invalid email: {}", email))),
    }
}

/// Accounts: registration, token issuance, principal resolution and
/// member administration
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CertificateStore>,
    keys: JwtKeys,
}

impl AccountService {
    pub fn new(store: Arc<dyn CertificateStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    pub async fn register(&self, registration: Registration) -> CoreResult<User> {
        naming::username(&registration.username)?;
        if let Some(full_name) = &registration.full_name {
            naming::full_name(full_name)?;
        }
        if let Some(email) = &registration.email {
            validate_email(email)?;
        }
        if registration.password.is_empty() {
            return Err(CoreError::InvalidInput("password must not be empty".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: registration.username,
            hashed_password: hash_password(&registration.password)?,
            email: registration.email,
            full_name: registration.full_name,
            role: Role::Member,
            organization_token: None,
            disabled: false,
            expiration_date: None,
            date: Utc::now(),
        };
        let username = user.username.clone();
        match self.store.insert_principal(user).await? {
            Insertion::Inserted(user) => {
                info!("Registered user {}", user.username);
                Ok(user)
            }
            _ => Err(CoreError::DuplicateSubject(format!("Username '{}'", username))),
        }
    }

    pub async fn login(&self, username: &str, password: &str, scope: Option<&str>) -> CoreResult<TokenResponse> {
        let user = self
            .store
            .find_principal(&PrincipalQuery::by_username(username))
            .await?
            .ok_or(CoreError::UnknownUser)?;
        if !verify_password(password, &user.hashed_password)? {
            warn!("Failed login for {}", username);
            return Err(CoreError::WrongPassword);
        }
        let access_token = self.keys.issue(&user.username, Scope::parse_list(scope))?;
        info!("Issued access token for {}", user.username);
        Ok(TokenResponse { access_token, token_type: "bearer".to_string() })
    }

    /// Bearer token to principal. Any failure is `Unauthenticated`.
    pub async fn resolve(&self, token: &str) -> CoreResult<Principal> {
        let claims = self.keys.verify(token).map_err(|_| CoreError::Unauthenticated)?;
        let user = self
            .store
            .find_principal(&PrincipalQuery::by_username(&claims.sub))
            .await?
            .ok_or(CoreError::Unauthenticated)?;
        Ok(Principal::from_user(user, claims.scopes))
    }

    pub fn current_profile<'a>(&self, principal: &'a Principal) -> CoreResult<&'a Principal> {
        evaluate(principal, Capability::READ_PROFILE, Utc::now())
            .into_result()
            .map_err(CoreError::Denied)?;
        Ok(principal)
    }

    /// Super Admins may change anything. Admins stay inside their own
    /// organization and cannot hand out more than Admin.
    pub async fn update_member(&self, actor: &Principal, username: &str, patch: PrincipalPatch) -> CoreResult<User> {
        evaluate(actor, Capability::MANAGE_MEMBERS, Utc::now())
            .into_result()
            .map_err(CoreError::Denied)?;
        if patch.is_empty() {
            return Err(CoreError::InvalidInput("Nothing to update".to_string()));
        }
        if let Some(full_name) = &patch.full_name {
            naming::full_name(full_name)?;
        }
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }

        let target = self
            .store
            .find_principal(&PrincipalQuery::by_username(username))
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("User '{}'", username)))?;

        if actor.role != Role::SuperAdmin {
            let target_token = target.organization_token.as_deref().unwrap_or_default();
            within_organization(actor, target_token).into_result().map_err(CoreError::Denied)?;
            if Privilege::of(target.role) > Privilege::Admin {
                return Err(CoreError::Denied(DenyReason::InsufficientRole));
            }
            if patch.role.map_or(false, |role| Privilege::of(role) > Privilege::Admin) {
                return Err(CoreError::Denied(DenyReason::InsufficientRole));
            }
            if let Some(token) = &patch.organization_token {
                if actor.organization_token.as_deref() != Some(token.as_str()) {
                    return Err(CoreError::Denied(DenyReason::OutsideOrganization));
                }
            }
        }

        match self.store.update_principal(target.id, patch).await? {
            Modification::Modified(user) => {
                info!("User {} updated by {}", user.username, actor.username);
                Ok(user)
            }
            Modification::NotFound => Err(CoreError::NotFound(format!("User '{}'", username))),
            Modification::Duplicate => Err(CoreError::DuplicateSubject(format!("Username '{}'", username))),
        }
    }

    /// Create the account as Super Admin, or promote and re-enable an
    /// existing one. The stored password of an existing account is kept.
    pub async fn ensure_super_admin(&self, username: &str, password: &str) -> CoreResult<User> {
        if let Some(existing) = self.store.find_principal(&PrincipalQuery::by_username(username)).await? {
            if existing.role == Role::SuperAdmin && !existing.disabled {
                return Ok(existing);
            }
            let patch = PrincipalPatch { role: Some(Role::SuperAdmin), disabled: Some(false), ..Default::default() };
            return match self.store.update_principal(existing.id, patch).await? {
                Modification::Modified(user) => {
                    info!("Promoted {} to Super Admin", user.username);
                    Ok(user)
                }
                _ => Err(CoreError::NotFound(format!("User '{}'", username))),
            };
        }

        let user = self
            .register(Registration {
                username: username.to_string(),
                password: password.to_string(),
                email: None,
                full_name: None,
            })
            .await?;
        let patch = PrincipalPatch { role: Some(Role::SuperAdmin), ..Default::default() };
        match self.store.update_principal(user.id, patch).await? {
            Modification::Modified(user) => {
                info!("Bootstrapped Super Admin {}", user.username);
                Ok(user)
            }
            _ => Err(CoreError::NotFound(format!("User '{}'", username))),
        }
    }
}
