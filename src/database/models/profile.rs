use serde::{Deserialize, Serialize};

use super::REDACTED;

fn default_purpose() -> String {
    "GENERAL".to_string()
}

fn default_validity_days() -> i32 {
    730
}

/// Certificate request profile carried by intermediates and terminals.
///
/// The signer fields are never chosen by the caller: they are copied down
/// from the parent when the record is issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateProfile {
    #[serde(default)]
    pub signer_profile_name: String,
    #[serde(default)]
    pub signer_password: String,
    #[serde(default = "default_purpose")]
    pub signer_purpose: String,
    pub profile_name: String,
    pub password: String,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub org_unit: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default = "default_validity_days")]
    pub validity_days: i32,
    #[serde(default)]
    pub req_ref_no: Option<i64>,
}

impl CertificateProfile {
    pub fn with_signer(mut self, profile_name: &str, password: &str) -> Self {
        self.signer_profile_name = profile_name.to_string();
        self.signer_password = password.to_string();
        self
    }

    pub fn redacted(mut self) -> Self {
        self.signer_password = REDACTED.to_string();
        self.password = REDACTED.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.profile_name.trim().is_empty() {
            return Err("profileName must not be empty".to_string());
        }
        if self.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        if self.validity_days <= 0 {
            return Err("validityDays must be positive".to_string());
        }
        if let Some(country) = &self.country {
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
                return Err("country must be a two-letter code".to_string());
            }
        }
        Ok(())
    }
}
