/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Levels of the certificate hierarchy, root first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityLevel {
    Organization,
    Intermediate,
    Terminal,
}

impl EntityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLevel::Organization => "organization",
            EntityLevel::Intermediate => "intermediate",
            EntityLevel::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for EntityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutations recorded in the transaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Register,
    Issue,
    Update,
    Grant,
    Revoke,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::Issue => "issue",
            Operation::Update => "update",
            Operation::Grant => "grant",
            Operation::Revoke => "revoke",
        }
    }
}

/// Skip/limit window for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(skip: Option<i64>, limit: Option<i64>, default_limit: i64, max_limit: i64) -> Self {
        let skip = skip.unwrap_or(0).max(0);
        let limit = limit.unwrap_or(default_limit).clamp(0, max_limit.max(0));
        Self { skip, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_to_bounds() {
        assert_eq!(Page::new(None, None, 10, 100), Page { skip: 0, limit: 10 });
        assert_eq!(Page::new(Some(-5), Some(5000), 10, 100), Page { skip: 0, limit: 100 });
        assert_eq!(Page::new(Some(20), Some(-1), 10, 100), Page { skip: 20, limit: 0 });
    }

    #[test]
    fn negative_maximum_yields_empty_page() {
        assert_eq!(Page::new(None, Some(5), 10, -1), Page { skip: 0, limit: 0 });
    }
}
