//! System Module
//!
//! Describes where and how workflow tasks run. The system module is also
//! the entry point that hands the workflow to a driver.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use super::role::Role;
use super::state::{kind_drift, parse_selector, state_conversions, CheckContext, Module};

/// Compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemKind {
    /// Tasks run one after another on this machine.
    Serial,
    Slurm,
    Pbs,
    Lsf,
}

impl SystemKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Slurm => "slurm",
            Self::Pbs => "pbs",
            Self::Lsf => "lsf",
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SystemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "serial" => Ok(Self::Serial),
            "slurm" => Ok(Self::Slurm),
            "pbs" => Ok(Self::Pbs),
            "lsf" => Ok(Self::Lsf),
            _ => Err(format!("unknown system '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemModule {
    pub kind: SystemKind,

    /// Run title, used to name submitted jobs
    pub title: String,

    /// Number of simultaneous tasks (one per source)
    pub ntask: i64,

    /// Processors per task
    pub nproc: i64,

    /// Wall-clock limit in minutes
    pub walltime: f64,

    /// How many times the workflow has been handed to a driver
    #[serde(default)]
    pub submissions: u32,
}

impl SystemModule {
    pub fn record_submission(&mut self) {
        self.submissions += 1;
    }
}

impl Module for SystemModule {
    const ROLE: Role = Role::System;

    fn build(context: &CheckContext<'_>) -> Result<Self, String> {
        let parameters = context.parameters;
        Ok(Self {
            kind: parse_selector(parameters, "SYSTEM")?,
            title: parameters.require_str("TITLE")?.to_string(),
            ntask: parameters.require_int("NTASK")?,
            nproc: parameters.require_int("NPROC")?,
            walltime: parameters.require_float("WALLTIME")?,
            submissions: 0,
        })
    }

    fn check(&self, context: &CheckContext<'_>) -> Vec<String> {
        let mut problems = Vec::new();

        if self.ntask < 1 {
            problems.push(format!("NTASK must be at least 1, found {}", self.ntask));
        }
        if self.nproc < 1 {
            problems.push(format!("NPROC must be at least 1, found {}", self.nproc));
        }
        if !self.walltime.is_finite() || self.walltime <= 0.0 {
            problems.push(format!(
                "WALLTIME must be a positive finite number, found {}",
                self.walltime
            ));
        }

        if self.kind == SystemKind::Serial && self.ntask > 0 && self.nproc > 0 {
            let requested = self
                .ntask
                .checked_mul(self.nproc)
                .and_then(|cores| usize::try_from(cores).ok());
            let available = num_cpus::get();
            match requested {
                Some(requested) if requested <= available => {}
                Some(requested) => warn!(
                    "Serial system requests {} cores but only {} are available; tasks will run one at a time",
                    requested, available
                ),
                None => warn!(
                    "Serial system requests {} x {} cores, more than any host provides",
                    self.ntask, self.nproc
                ),
            }
        }

        problems.extend(kind_drift("SYSTEM", self.kind, context));
        problems
    }

    state_conversions!(System);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_configuration;

    #[test]
    fn test_build_from_parameters() {
        let (parameters, paths) = sample_configuration();
        let system = SystemModule::build(&CheckContext::new(&parameters, &paths)).unwrap();

        assert_eq!(system.kind, SystemKind::Serial);
        assert_eq!(system.title, "test_inversion");
        assert_eq!(system.ntask, 2);
        assert_eq!(system.submissions, 0);
    }

    #[test]
    fn test_unknown_system_fails_build() {
        let (mut parameters, paths) = sample_configuration();
        parameters.insert("SYSTEM", "cloud");

        let err = SystemModule::build(&CheckContext::new(&parameters, &paths)).unwrap_err();
        assert!(err.contains("unknown system 'cloud'"));
    }

    #[test]
    fn test_check_rejects_bad_counts() {
        let (mut parameters, paths) = sample_configuration();
        parameters.insert("NTASK", 0i64);
        parameters.insert("WALLTIME", -1.0);
        let context = CheckContext::new(&parameters, &paths);

        let system = SystemModule::build(&context).unwrap();
        let problems = system.check(&context);

        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("NTASK"));
        assert!(problems[1].contains("WALLTIME"));
    }

    #[test]
    fn test_check_rejects_infinite_walltime() {
        let (parameters, paths) = sample_configuration();
        let context = CheckContext::new(&parameters, &paths);

        let mut system = SystemModule::build(&context).unwrap();
        system.walltime = f64::INFINITY;

        let problems = system.check(&context);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("WALLTIME must be a positive finite number"));
    }

    #[test]
    fn test_check_huge_task_counts() {
        let (mut parameters, paths) = sample_configuration();
        parameters.insert("NTASK", 9_999_999_999i64);
        parameters.insert("NPROC", 9_999_999_999i64);
        let context = CheckContext::new(&parameters, &paths);

        let system = SystemModule::build(&context).unwrap();
        assert!(system.check(&context).is_empty());
    }

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!("SLURM".parse::<SystemKind>().unwrap(), SystemKind::Slurm);
    }
}
