use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Append-only audit entry in `transaction_logs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLog {
    pub id: Uuid,
    pub method: String,
    pub endpoint: String,
    pub operation: String,
    pub payload: Value,
    pub info_user: Option<Value>,
    pub datetime: DateTime<Utc>,
}
