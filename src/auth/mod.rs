pub mod csrf;
pub mod password;
pub mod policy;
pub mod principal;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::config::SecurityConfig;

pub use csrf::CsrfSigner;
pub use policy::{evaluate, within_organization, Capability, Decision, DenyReason, Privilege};
pub use principal::Principal;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Password hashing error: {0}")]
    Crypto(String),

    #[error("Missing Cookie csrf-token")]
    MissingCsrf,

    #[error("Invalid CSRF token")]
    InvalidCsrf,
}

/// Token scopes. Each capability names the scope a caller must have been granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Read own profile
    Me,
    /// Certificate hierarchy operations
    Signs,
    Items,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Me, Scope::Signs, Scope::Items];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Me => "me",
            Scope::Signs => "signs",
            Scope::Items => "items",
        }
    }

    /// Parse an OAuth2 space-separated scope string, ignoring unknown entries.
    /// An empty request grants every scope.
    pub fn parse_list(raw: Option<&str>) -> Vec<Scope> {
        let requested: Vec<Scope> = raw
            .unwrap_or_default()
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        if requested.is_empty() {
            Scope::ALL.to_vec()
        } else {
            requested
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "me" => Ok(Scope::Me),
            "signs" => Ok(Scope::Signs),
            "items" => Ok(Scope::Items),
            other => Err(format!("unknown scope '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub scopes: Vec<Scope>,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 keys derived from the configured secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl JwtKeys {
    pub fn from_config(security: &SecurityConfig) -> Result<Self, AuthError> {
        if security.jwt_secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(security.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(security.jwt_secret.as_bytes()),
            expiry: Duration::minutes(security.jwt_expiry_minutes),
        })
    }

    pub fn issue(&self, username: &str, scopes: Vec<Scope>) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            scopes,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}
