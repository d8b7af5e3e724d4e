pub mod account;
pub mod audit;
pub mod directory;
pub mod error;
pub mod hierarchy;
pub mod lifecycle;
pub mod naming;
pub mod quota;

use std::sync::Arc;

use crate::auth::{AuthError, JwtKeys};
use crate::config::AppConfig;
use crate::database::CertificateStore;

pub use account::{AccountService, Registration, TokenResponse};
pub use audit::AuditLog;
pub use directory::Directory;
pub use error::{CoreError, CoreResult};
pub use hierarchy::HierarchyValidator;
pub use lifecycle::{LifecycleOrchestrator, NewIntermediate, NewOrganization, NewTerminal};
pub use quota::QuotaLedger;

/// Every service wired over one store
#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub directory: Directory,
    pub lifecycle: LifecycleOrchestrator,
    pub ledger: QuotaLedger,
    pub audit: AuditLog,
}

impl Services {
    pub fn new(store: Arc<dyn CertificateStore>, config: &AppConfig) -> Result<Self, AuthError> {
        let keys = JwtKeys::from_config(&config.security)?;
        let validator = HierarchyValidator::new(store.clone());
        let ledger = QuotaLedger::new(store.clone());
        Ok(Self {
            accounts: AccountService::new(store.clone(), keys),
            directory: Directory::new(store.clone()),
            lifecycle: LifecycleOrchestrator::new(store.clone(), validator, ledger.clone(), config.quota.clone()),
            ledger,
            audit: AuditLog::new(store, config.security.enable_audit_logging),
        })
    }
}
