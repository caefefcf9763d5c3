//! Module Roles
//!
//! The fixed set of named slots a workflow is made of.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named module slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parameters,
    Paths,
    System,
    Solver,
    Optimize,
    Preprocess,
    Postprocess,
    Workflow,
}

impl Role {
    /// Every role, in load and validation order.
    pub const ALL: [Role; 8] = [
        Role::Parameters,
        Role::Paths,
        Role::System,
        Role::Solver,
        Role::Optimize,
        Role::Preprocess,
        Role::Postprocess,
        Role::Workflow,
    ];

    /// Stable name used in file names and messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Parameters => "parameters",
            Self::Paths => "paths",
            Self::System => "system",
            Self::Solver => "solver",
            Self::Optimize => "optimize",
            Self::Preprocess => "preprocess",
            Self::Postprocess => "postprocess",
            Self::Workflow => "workflow",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.name() == s)
            .ok_or_else(|| format!("unknown module role '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.name().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_serde_name_matches_display() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role));
        }
    }

    #[test]
    fn test_unknown_role() {
        assert!("optimizer".parse::<Role>().is_err());
        assert!("System".parse::<Role>().is_err());
    }
}
