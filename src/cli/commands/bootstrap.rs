use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::Services;

pub async fn handle(username: &str, password: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let store = DatabaseManager::open_store(&config.database).await?;
    let services = Services::new(store, &config)?;
    let user = services.accounts.ensure_super_admin(username, password).await?;
    output_success(
        output_format,
        &format!("Super Admin '{}' ready", user.username),
        Some(json!({"id": user.id, "username": user.username, "role": user.role})),
    )
}
