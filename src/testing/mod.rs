//! Seeded in-memory stores for unit tests.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::auth::{Principal, Scope};
use crate::config::{AppConfig, Environment};
use crate::database::models::{
    CertificateProfile, Intermediate, IntermediateKind, Organization, Role, SignerCredential, User,
};
use crate::database::{CertificateStore, Insertion, MemoryStore};
use crate::services::Services;

pub const PASSWORD: &str = "secret";

pub struct Fixture {
    pub config: AppConfig,
    pub memory: Arc<MemoryStore>,
    pub store: Arc<dyn CertificateStore>,
}

impl Fixture {
    pub async fn new() -> Self {
        let memory = Arc::new(MemoryStore::new());
        Self {
            config: AppConfig::preset(Environment::Development),
            store: memory.clone(),
            memory,
        }
    }

    pub fn services(&self) -> Services {
        Services::new(self.store.clone(), &self.config).unwrap()
    }

    pub fn profile(&self) -> CertificateProfile {
        serde_json::from_value(json!({"profileName": "Arak", "password": "secret"})).unwrap()
    }

    async fn insert_organization(&self, org: Organization) -> Organization {
        match self.store.insert_organization(org).await.unwrap() {
            Insertion::Inserted(org) => org,
            other => panic!("seed organization failed: {:?}", other),
        }
    }

    pub async fn organization(&self, name: &str, signing: i64, certificate: i64) -> Organization {
        self.insert_organization(Organization {
            id: Uuid::new_v4(),
            token: format!("token-{}", Uuid::new_v4().simple()),
            name: name.to_string(),
            signing_quota: signing,
            signing_quota_remaining: signing,
            certificate_quota: certificate,
            certificate_quota_remaining: certificate,
            signer: SignerCredential { profile_name: "yourSign_test_itmd".to_string(), password: "P@ssw0rd".to_string() },
            expiration: None,
            date: Utc::now(),
        })
        .await
    }

    pub async fn organization_expiring(&self, name: &str, expiration: DateTime<Utc>) -> Organization {
        let org = self.organization(name, 5, 5).await;
        let patch = crate::database::models::OrganizationPatch { expiration: Some(expiration), ..Default::default() };
        match self.store.update_organization(org.id, patch).await.unwrap() {
            crate::database::Modification::Modified(org) => org,
            other => panic!("seed expiration failed: {:?}", other),
        }
    }

    pub async fn intermediate(&self, token: &str, name: &str, kind: IntermediateKind) -> Intermediate {
        let record = Intermediate {
            id: Uuid::new_v4(),
            organization_token: token.to_string(),
            name: name.to_string(),
            kind,
            detail: self.profile().with_signer("yourSign_test_itmd", "P@ssw0rd"),
            expiration: None,
            disabled: false,
            date: Utc::now(),
        };
        match self.store.insert_intermediate(record, None).await.unwrap() {
            Insertion::Inserted(record) => record,
            other => panic!("seed intermediate failed: {:?}", other),
        }
    }

    pub async fn user(&self, username: &str, role: Role, token: Option<&str>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            hashed_password: hash_password(PASSWORD).unwrap(),
            email: None,
            full_name: None,
            role,
            organization_token: token.map(str::to_string),
            disabled: false,
            expiration_date: None,
            date: Utc::now(),
        };
        match self.store.insert_principal(user).await.unwrap() {
            Insertion::Inserted(user) => user,
            other => panic!("seed user failed: {:?}", other),
        }
    }

    /// Stored user plus a principal holding every scope
    pub async fn principal(&self, username: &str, role: Role, token: Option<&str>) -> Principal {
        Principal::from_user(self.user(username, role, token).await, Scope::ALL.to_vec())
    }
}
