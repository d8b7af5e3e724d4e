// handlers/protected/mod.rs - Handlers behind bearer authentication
//
// Every handler here receives the resolved `Principal` through request
// extensions and leaves authorization to the service it calls.
pub mod auth;
pub mod initial;

use serde::Deserialize;

/// `?skip=&limit=` window shared by the listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct Window {
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}
