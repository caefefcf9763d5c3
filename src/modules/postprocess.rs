//! Postprocessing Module
//!
//! Kernel summation and smoothing settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::role::Role;
use super::state::{kind_drift, parse_selector, state_conversions, CheckContext, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostprocessKind {
    Base,
}

impl fmt::Display for PostprocessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
        }
    }
}

impl FromStr for PostprocessKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" | "default" => Ok(Self::Base),
            _ => Err(format!("unknown postprocessing module '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostprocessModule {
    pub kind: PostprocessKind,

    /// Horizontal smoothing length
    pub smooth_h: f64,

    /// Vertical smoothing length
    pub smooth_v: f64,

    /// Gradients summed and smoothed so far
    #[serde(default)]
    pub gradients: u32,
}

impl Module for PostprocessModule {
    const ROLE: Role = Role::Postprocess;

    fn build(context: &CheckContext<'_>) -> Result<Self, String> {
        let parameters = context.parameters;
        Ok(Self {
            kind: parse_selector(parameters, "POSTPROCESS")?,
            smooth_h: parameters.require_float("SMOOTH_H")?,
            smooth_v: parameters.require_float("SMOOTH_V")?,
            gradients: 0,
        })
    }

    fn check(&self, context: &CheckContext<'_>) -> Vec<String> {
        let mut problems = Vec::new();

        for (key, value) in [("SMOOTH_H", self.smooth_h), ("SMOOTH_V", self.smooth_v)] {
            if !value.is_finite() || value < 0.0 {
                problems.push(format!("{} must be a non-negative number, found {}", key, value));
            }
        }

        problems.extend(kind_drift("POSTPROCESS", self.kind, context));
        problems
    }

    state_conversions!(Postprocess);
}
