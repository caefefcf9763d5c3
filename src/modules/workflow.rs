//! Workflow Module
//!
//! The workflow is an ordered list of stages repeated once per iteration.
//! This module records where in that sequence the run is, which is the
//! state a resume has to restore exactly.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use super::role::Role;
use super::state::{kind_drift, parse_selector, state_conversions, CheckContext, Module};
use crate::config::Parameters;

const INVERSION_STAGES: &[&str] = &[
    "initialize",
    "evaluate_gradient",
    "write_gradient",
    "compute_direction",
    "line_search",
    "finalize",
    "clean",
];

const MIGRATION_STAGES: &[&str] = &["setup", "evaluate_gradient", "process_kernels", "finalize"];

const FORWARD_STAGES: &[&str] = &["setup", "generate_synthetics", "finalize"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    Inversion,
    Migration,
    /// Forward simulations only; runs a single iteration.
    Forward,
}

impl WorkflowKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Inversion => "inversion",
            Self::Migration => "migration",
            Self::Forward => "forward",
        }
    }

    /// Stages of one iteration, in execution order.
    pub fn stages(self) -> &'static [&'static str] {
        match self {
            Self::Inversion => INVERSION_STAGES,
            Self::Migration => MIGRATION_STAGES,
            Self::Forward => FORWARD_STAGES,
        }
    }

    fn stage_index(self, stage: &str) -> Option<usize> {
        self.stages().iter().position(|s| *s == stage)
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkflowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inversion" => Ok(Self::Inversion),
            "migration" => Ok(Self::Migration),
            "forward" => Ok(Self::Forward),
            _ => Err(format!("unknown workflow '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowModule {
    pub kind: WorkflowKind,

    /// First iteration
    pub begin: i64,

    /// Last iteration (inclusive)
    pub end: i64,

    /// Iteration in progress
    pub iteration: i64,

    /// Stage to start the first iteration from
    #[serde(default)]
    pub resume_from: Option<String>,

    /// Stage after which the run stops
    #[serde(default)]
    pub stop_after: Option<String>,

    /// Stages finished in the current iteration
    #[serde(default)]
    pub completed: Vec<String>,

    /// Set once the last iteration is done
    #[serde(default)]
    pub finished: bool,
}

impl WorkflowModule {
    /// Stages of the current iteration that still have to run.
    pub fn pending_stages(&self) -> Vec<&'static str> {
        if self.finished {
            return Vec::new();
        }
        self.kind
            .stages()
            .iter()
            .copied()
            .filter(|stage| !self.completed.iter().any(|done| done == stage))
            .collect()
    }

    pub fn complete_stage(&mut self, stage: &str) {
        if !self.completed.iter().any(|done| done == stage) {
            self.completed.push(stage.to_string());
        }
    }

    /// True when the run should stop once `stage` is done.
    pub fn stops_after(&self, stage: &str) -> bool {
        self.stop_after.as_deref() == Some(stage)
    }

    /// Takes `STOP_AFTER` from the current parameters.
    ///
    /// Used on resume, where everything else comes from the checkpoint.
    pub fn apply_run_controls(&mut self, parameters: &Parameters) {
        self.stop_after = parameters.get_str("STOP_AFTER").map(str::to_string);
    }

    /// Moves to the next iteration, marking the run finished after `end`.
    pub fn advance_iteration(&mut self) {
        self.iteration += 1;
        self.completed.clear();
        if self.iteration > self.end {
            self.finished = true;
        }
    }
}

impl Module for WorkflowModule {
    const ROLE: Role = Role::Workflow;

    fn build(context: &CheckContext<'_>) -> Result<Self, String> {
        let parameters = context.parameters;
        let kind: WorkflowKind = parse_selector(parameters, "WORKFLOW")?;
        let begin = parameters.require_int("BEGIN")?;
        let resume_from = parameters.get_str("RESUME_FROM").map(str::to_string);

        // Stages before RESUME_FROM count as done for the first iteration.
        let completed = resume_from
            .as_deref()
            .and_then(|stage| kind.stage_index(stage))
            .map(|index| kind.stages()[..index].iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        Ok(Self {
            kind,
            begin,
            end: parameters.require_int("END")?,
            iteration: begin,
            resume_from,
            stop_after: parameters.get_str("STOP_AFTER").map(str::to_string),
            completed,
            finished: false,
        })
    }

    fn check(&self, context: &CheckContext<'_>) -> Vec<String> {
        let mut problems = Vec::new();

        if self.begin < 1 {
            problems.push(format!("BEGIN must be at least 1, found {}", self.begin));
        }
        if self.end < self.begin {
            problems.push(format!(
                "END ({}) must not be before BEGIN ({})",
                self.end, self.begin
            ));
        }
        if self.kind == WorkflowKind::Forward && self.end != self.begin {
            problems.push("forward workflows run a single iteration; set END equal to BEGIN".to_string());
        }
        if self.iteration < self.begin || self.iteration > self.end + 1 {
            problems.push(format!(
                "iteration {} is outside BEGIN..END ({}..{})",
                self.iteration, self.begin, self.end
            ));
        }

        for (key, stage) in [("RESUME_FROM", &self.resume_from), ("STOP_AFTER", &self.stop_after)] {
            if let Some(stage) = stage {
                if self.kind.stage_index(stage).is_none() {
                    problems.push(format!(
                        "{} '{}' is not a stage of the {} workflow (stages: {})",
                        key,
                        stage,
                        self.kind,
                        self.kind.stages().join(", ")
                    ));
                }
            }
        }

        for stage in &self.completed {
            if self.kind.stage_index(stage).is_none() {
                problems.push(format!("completed stage '{}' is unknown", stage));
            }
        }

        if let (Some(from), Some(stop)) = (&self.resume_from, &self.stop_after) {
            if let (Some(f), Some(s)) = (self.kind.stage_index(from), self.kind.stage_index(stop)) {
                if s < f {
                    warn!(
                        "STOP_AFTER '{}' comes before RESUME_FROM '{}'; the first iteration will run to completion",
                        stop, from
                    );
                }
            }
        }

        problems.extend(kind_drift("WORKFLOW", self.kind, context));
        problems
    }

    state_conversions!(Workflow);
}
