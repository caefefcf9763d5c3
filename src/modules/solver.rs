//! Solver Module
//!
//! Bookkeeping for the external wave-equation solver: which one, on how
//! many processors, from which starting model, and how many forward and
//! adjoint evaluations have been run so far.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::role::Role;
use super::state::{kind_drift, parse_selector, state_conversions, CheckContext, Module};

/// Path key of the starting model.
const MODEL_INIT_KEY: &str = "MODEL_INIT";

/// Data cases the solver understands.
const CASES: &[&str] = &["synthetic", "data"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverKind {
    #[serde(rename = "specfem2d")]
    Specfem2d,
    #[serde(rename = "specfem3d")]
    Specfem3d,
    #[serde(rename = "specfem3d_globe")]
    Specfem3dGlobe,
}

impl SolverKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Specfem2d => "specfem2d",
            Self::Specfem3d => "specfem3d",
            Self::Specfem3dGlobe => "specfem3d_globe",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "specfem2d" => Ok(Self::Specfem2d),
            "specfem3d" => Ok(Self::Specfem3d),
            "specfem3d_globe" => Ok(Self::Specfem3dGlobe),
            _ => Err(format!("unknown solver '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverModule {
    pub kind: SolverKind,

    /// `synthetic` or `data`
    pub case: String,

    pub nproc: i64,

    /// Starting model directory
    pub model_init: PathBuf,

    /// Forward/adjoint simulations completed
    #[serde(default)]
    pub evaluations: u64,
}

impl SolverModule {
    pub fn record_evaluations(&mut self, count: u64) {
        self.evaluations += count;
    }
}

impl Module for SolverModule {
    const ROLE: Role = Role::Solver;

    fn build(context: &CheckContext<'_>) -> Result<Self, String> {
        let parameters = context.parameters;
        Ok(Self {
            kind: parse_selector(parameters, "SOLVER")?,
            case: parameters.require_str("CASE")?.to_ascii_lowercase(),
            nproc: parameters.require_int("NPROC")?,
            model_init: context
                .paths
                .get(MODEL_INIT_KEY)
                .map(PathBuf::from)
                .unwrap_or_default(),
            evaluations: 0,
        })
    }

    fn check(&self, context: &CheckContext<'_>) -> Vec<String> {
        let mut problems = Vec::new();

        if self.nproc < 1 {
            problems.push(format!("NPROC must be at least 1, found {}", self.nproc));
        }
        if !CASES.contains(&self.case.as_str()) {
            problems.push(format!(
                "CASE must be one of {:?}, found '{}'",
                CASES, self.case
            ));
        }
        if self.model_init.as_os_str().is_empty() {
            problems.push(format!("path {} is not set", MODEL_INIT_KEY));
        }

        problems.extend(kind_drift("SOLVER", self.kind, context));
        problems
    }

    state_conversions!(Solver);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_configuration;

    #[test]
    fn test_build_takes_model_from_paths() {
        let (parameters, paths) = sample_configuration();
        let solver = SolverModule::build(&CheckContext::new(&parameters, &paths)).unwrap();

        assert_eq!(solver.kind, SolverKind::Specfem2d);
        assert_eq!(solver.model_init.as_path(), paths.get("MODEL_INIT").unwrap());
    }

    #[test]
    fn test_missing_model_init() {
        let (parameters, _) = sample_configuration();
        let paths = crate::config::Paths::new();
        let context = CheckContext::new(&parameters, &paths);

        let solver = SolverModule::build(&context).unwrap();
        let problems = solver.check(&context);

        assert!(problems.iter().any(|p| p.contains("MODEL_INIT is not set")));
    }

    #[test]
    fn test_unknown_case() {
        let (mut parameters, paths) = sample_configuration();
        parameters.insert("CASE", "Observed");
        let context = CheckContext::new(&parameters, &paths);

        let solver = SolverModule::build(&context).unwrap();
        assert_eq!(solver.check(&context).len(), 1);
    }

    #[test]
    fn test_solver_drift() {
        let (parameters, paths) = sample_configuration();
        let solver = SolverModule::build(&CheckContext::new(&parameters, &paths)).unwrap();

        let mut current = parameters.clone();
        current.insert("SOLVER", "specfem3d_globe");
        let problems = solver.check(&CheckContext::new(&current, &paths));

        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("SOLVER changed"));
    }
}
