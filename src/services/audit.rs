use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::auth::Principal;
use crate::database::models::TransactionLog;
use crate::database::CertificateStore;
use crate::types::Operation;

/// Best-effort transaction log. A failed append is logged and otherwise
/// ignored: the operation it describes has already committed.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn CertificateStore>,
    enabled: bool,
}

impl AuditLog {
    pub fn new(store: Arc<dyn CertificateStore>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    pub async fn record(
        &self,
        method: &str,
        endpoint: &str,
        operation: Operation,
        payload: Value,
        actor: Option<&Principal>,
    ) {
        if !self.enabled {
            return;
        }
        let entry = TransactionLog {
            id: Uuid::new_v4(),
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            operation: operation.as_str().to_string(),
            payload,
            info_user: actor.map(|p| json!({"uid": p.id, "username": p.username, "role": p.role})),
            datetime: Utc::now(),
        };
        if let Err(e) = self.store.append_log(entry).await {
            error!("Failed to append transaction log for {} {}: {}", method, endpoint, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn records_only_when_enabled() {
        let fx = Fixture::new().await;
        let actor = fx.principal("root", Role::SuperAdmin, None).await;

        AuditLog::new(fx.store.clone(), false)
            .record("POST", "/initial/issue/company", Operation::Issue, json!({}), Some(&actor))
            .await;
        assert!(fx.memory.transaction_logs().await.is_empty());

        AuditLog::new(fx.store.clone(), true)
            .record("POST", "/initial/issue/company", Operation::Issue, json!({"name": "Thaicom"}), Some(&actor))
            .await;
        let logs = fx.memory.transaction_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].operation, "issue");
        assert_eq!(logs[0].info_user.as_ref().unwrap()["username"], "root");
    }
}
