//! Tracker role categories.
//!
//! The upstream tracker groups detections by on-field role. Team assignment
//! pools all of them together; the grouping only matters for iteration order
//! and for the renderer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Role category assigned by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    /// Skill-position players (receivers, backs)
    Skill,
    /// Defensive backs
    Db,
    /// Linebackers
    Lb,
    /// Center
    Center,
    /// Quarterback
    Qb,
}

impl RoleCategory {
    /// All categories, in processing order.
    pub const ALL: &'static [RoleCategory] = &[
        RoleCategory::Skill,
        RoleCategory::Db,
        RoleCategory::Lb,
        RoleCategory::Center,
        RoleCategory::Qb,
    ];

    /// Returns the category name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleCategory::Skill => "skill",
            RoleCategory::Db => "db",
            RoleCategory::Lb => "lb",
            RoleCategory::Center => "center",
            RoleCategory::Qb => "qb",
        }
    }
}

impl fmt::Display for RoleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a role category name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role category: {0}")]
pub struct RoleCategoryError(pub String);

impl FromStr for RoleCategory {
    type Err = RoleCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skill" => Ok(RoleCategory::Skill),
            "db" => Ok(RoleCategory::Db),
            "lb" => Ok(RoleCategory::Lb),
            "center" => Ok(RoleCategory::Center),
            "qb" => Ok(RoleCategory::Qb),
            _ => Err(RoleCategoryError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for role in RoleCategory::ALL {
            assert_eq!(role.as_str().parse::<RoleCategory>().unwrap(), *role);
        }
    }

    #[test]
    fn test_unknown_role() {
        assert!("kicker".parse::<RoleCategory>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(serde_json::to_string(&RoleCategory::Qb).unwrap(), "\"qb\"");
    }
}
