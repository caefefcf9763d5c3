//! Optimization Module
//!
//! Tracks the nonlinear optimization: method, line search settings and
//! the counters that must survive a restart (iteration, trial steps,
//! restarts of the search direction).

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use super::role::Role;
use super::state::{kind_drift, parse_selector, state_conversions, CheckContext, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptimizeMethod {
    /// Gradient descent
    Gd,
    /// Limited-memory BFGS
    Lbfgs,
    /// Nonlinear conjugate gradient
    Nlcg,
}

impl OptimizeMethod {
    pub fn name(self) -> &'static str {
        match self {
            Self::Gd => "GD",
            Self::Lbfgs => "LBFGS",
            Self::Nlcg => "NLCG",
        }
    }
}

impl fmt::Display for OptimizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OptimizeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GD" => Ok(Self::Gd),
            "LBFGS" => Ok(Self::Lbfgs),
            "NLCG" => Ok(Self::Nlcg),
            _ => Err(format!("unknown optimization method '{}'", s)),
        }
    }
}

/// Line search strategies. Names are capitalized by the sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSearch {
    Backtrack,
    Bracket,
    Fixed,
}

impl FromStr for LineSearch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Backtrack" => Ok(Self::Backtrack),
            "Bracket" => Ok(Self::Bracket),
            "Fixed" => Ok(Self::Fixed),
            _ => Err(format!("unknown line search '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeModule {
    pub method: OptimizeMethod,
    pub line_search: LineSearch,

    /// Maximum trial steps per line search
    pub step_count_max: i64,

    /// Initial step length as a fraction of the model norm
    pub step_len_init: f64,

    /// Iteration the optimizer is working on
    #[serde(default)]
    pub iteration: i64,

    /// Trial steps taken in the current line search
    #[serde(default)]
    pub step_count: i64,

    /// Times the search direction was reset to steepest descent
    #[serde(default)]
    pub restarts: u32,
}

impl OptimizeModule {
    /// Moves to `iteration` and resets the line search.
    pub fn begin_iteration(&mut self, iteration: i64) {
        if self.iteration != iteration {
            self.iteration = iteration;
            self.step_count = 0;
        }
    }

    /// Records one trial step.
    ///
    /// Exceeding `step_count_max` restarts the search direction.
    pub fn record_step(&mut self) {
        self.step_count += 1;
        if self.step_count > self.step_count_max {
            warn!(
                "Line search exceeded {} steps; restarting search direction",
                self.step_count_max
            );
            self.restarts += 1;
            self.step_count = 0;
        }
    }
}

impl Module for OptimizeModule {
    const ROLE: Role = Role::Optimize;

    fn build(context: &CheckContext<'_>) -> Result<Self, String> {
        let parameters = context.parameters;
        Ok(Self {
            method: parse_selector(parameters, "OPTIMIZE")?,
            line_search: parse_selector(parameters, "LINESEARCH")?,
            step_count_max: parameters.require_int("STEPCOUNTMAX")?,
            step_len_init: parameters.require_float("STEPLENINIT")?,
            iteration: parameters.require_int("BEGIN")?,
            step_count: 0,
            restarts: 0,
        })
    }

    fn check(&self, context: &CheckContext<'_>) -> Vec<String> {
        let mut problems = Vec::new();

        if self.step_count_max < 1 {
            problems.push(format!(
                "STEPCOUNTMAX must be at least 1, found {}",
                self.step_count_max
            ));
        }
        if !(self.step_len_init > 0.0 && self.step_len_init <= 1.0) {
            problems.push(format!(
                "STEPLENINIT must be in (0, 1], found {}",
                self.step_len_init
            ));
        }
        if self.method == OptimizeMethod::Nlcg && self.line_search == LineSearch::Backtrack {
            warn!("NLCG is usually paired with the Bracket line search");
        }

        problems.extend(kind_drift("OPTIMIZE", self.method, context));
        problems
    }

    state_conversions!(Optimize);
}
