//! Module State
//!
//! Each role's state is a plain serializable struct. [`ModuleState`] is the
//! closed sum over them and is what the registry holds and what
//! checkpoints store.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use super::optimize::OptimizeModule;
use super::postprocess::PostprocessModule;
use super::preprocess::PreprocessModule;
use super::role::Role;
use super::solver::SolverModule;
use super::system::SystemModule;
use super::workflow::WorkflowModule;
use crate::config::paths::{EXEMPT_KEYS, OUTPUT_KEY, SCRATCH_KEY};
use crate::config::vocabulary::{self, MODULE_SELECTORS, RUN_CONTROLS};
use crate::config::{Parameters, Paths};

/// The current, validated configuration that modules are built from and
/// checked against.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub parameters: &'a Parameters,
    pub paths: &'a Paths,
}

impl<'a> CheckContext<'a> {
    pub fn new(parameters: &'a Parameters, paths: &'a Paths) -> Self {
        Self { parameters, paths }
    }
}

/// A stateful workflow component bound to one role.
pub trait Module: Sized {
    const ROLE: Role;

    /// Constructs the module from configuration.
    fn build(context: &CheckContext<'_>) -> Result<Self, String>;

    /// Returns every problem with this module's configuration.
    ///
    /// Runs after construction and again after reloading from a
    /// checkpoint, where it also catches drift between the recorded
    /// state and the current parameter file.
    fn check(&self, context: &CheckContext<'_>) -> Vec<String>;

    fn into_state(self) -> ModuleState;

    fn from_state(state: &ModuleState) -> Option<&Self>;

    fn from_state_mut(state: &mut ModuleState) -> Option<&mut Self>;
}

/// Implements the `ModuleState` conversions of [`Module`] for a variant.
macro_rules! state_conversions {
    ($variant:ident) => {
        fn into_state(self) -> $crate::modules::ModuleState {
            $crate::modules::ModuleState::$variant(self)
        }

        fn from_state(state: &$crate::modules::ModuleState) -> Option<&Self> {
            match state {
                $crate::modules::ModuleState::$variant(module) => Some(module),
                _ => None,
            }
        }

        fn from_state_mut(state: &mut $crate::modules::ModuleState) -> Option<&mut Self> {
            match state {
                $crate::modules::ModuleState::$variant(module) => Some(module),
                _ => None,
            }
        }
    };
}

pub(crate) use state_conversions;

/// State of any role, tagged with the role it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", content = "state", rename_all = "lowercase")]
pub enum ModuleState {
    Parameters(Parameters),
    Paths(Paths),
    System(SystemModule),
    Solver(SolverModule),
    Optimize(OptimizeModule),
    Preprocess(PreprocessModule),
    Postprocess(PostprocessModule),
    Workflow(WorkflowModule),
}

impl ModuleState {
    pub fn role(&self) -> Role {
        match self {
            Self::Parameters(_) => Role::Parameters,
            Self::Paths(_) => Role::Paths,
            Self::System(_) => Role::System,
            Self::Solver(_) => Role::Solver,
            Self::Optimize(_) => Role::Optimize,
            Self::Preprocess(_) => Role::Preprocess,
            Self::Postprocess(_) => Role::Postprocess,
            Self::Workflow(_) => Role::Workflow,
        }
    }

    /// Names the fields holding NaN or an infinity. JSON cannot store
    /// either, so such a state must not be checkpointed.
    pub fn non_finite_fields(&self) -> Vec<String> {
        let floats = match self {
            Self::Parameters(m) => {
                return m
                    .iter()
                    .filter(|(_, value)| !value.is_finite())
                    .map(|(key, _)| key.clone())
                    .collect();
            }
            Self::System(m) => vec![("walltime", m.walltime)],
            Self::Optimize(m) => vec![("step_len_init", m.step_len_init)],
            Self::Postprocess(m) => vec![("smooth_h", m.smooth_h), ("smooth_v", m.smooth_v)],
            Self::Paths(_) | Self::Solver(_) | Self::Preprocess(_) | Self::Workflow(_) => {
                Vec::new()
            }
        };

        floats
            .into_iter()
            .filter(|(_, value)| !value.is_finite())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn check(&self, context: &CheckContext<'_>) -> Vec<String> {
        match self {
            Self::Parameters(m) => m.check(context),
            Self::Paths(m) => m.check(context),
            Self::System(m) => m.check(context),
            Self::Solver(m) => m.check(context),
            Self::Optimize(m) => m.check(context),
            Self::Preprocess(m) => m.check(context),
            Self::Postprocess(m) => m.check(context),
            Self::Workflow(m) => m.check(context),
        }
    }

    /// Builds the module for `role` from configuration.
    pub fn build(role: Role, context: &CheckContext<'_>) -> Result<Self, String> {
        Ok(match role {
            Role::Parameters => Parameters::build(context)?.into_state(),
            Role::Paths => Paths::build(context)?.into_state(),
            Role::System => SystemModule::build(context)?.into_state(),
            Role::Solver => SolverModule::build(context)?.into_state(),
            Role::Optimize => OptimizeModule::build(context)?.into_state(),
            Role::Preprocess => PreprocessModule::build(context)?.into_state(),
            Role::Postprocess => PostprocessModule::build(context)?.into_state(),
            Role::Workflow => WorkflowModule::build(context)?.into_state(),
        })
    }
}

/// Parses the implementation selected by `key`.
pub(crate) fn parse_selector<T>(parameters: &Parameters, key: &str) -> Result<T, String>
where
    T: FromStr<Err = String>,
{
    parameters
        .require_str(key)?
        .parse()
        .map_err(|e| format!("{}: {}", key, e))
}

/// Reports a change of the implementation selected by `key`.
///
/// Aliases that parse to the same kind are not a change.
pub(crate) fn kind_drift<T>(key: &str, recorded: T, context: &CheckContext<'_>) -> Option<String>
where
    T: FromStr + PartialEq + fmt::Display,
{
    let current = context.parameters.get_str(key)?;
    match current.parse::<T>() {
        Ok(kind) if kind == recorded => None,
        _ => Some(format!(
            "{} changed from '{}' to '{}' since the last checkpoint",
            key, recorded, current
        )),
    }
}

fn text_drift(key: &str, recorded: &str, context: &CheckContext<'_>) -> Option<String> {
    match context.parameters.get_str(key) {
        Some(current) if !current.eq_ignore_ascii_case(recorded) => Some(format!(
            "{} changed from '{}' to '{}' since the last checkpoint",
            key, recorded, current
        )),
        _ => None,
    }
}

impl Module for Parameters {
    const ROLE: Role = Role::Parameters;

    fn build(context: &CheckContext<'_>) -> Result<Self, String> {
        Ok(context.parameters.clone())
    }

    fn check(&self, context: &CheckContext<'_>) -> Vec<String> {
        let mut problems = vocabulary::problems(self);

        for key in MODULE_SELECTORS {
            if let Some(recorded) = self.get_str(key) {
                problems.extend(text_drift(key, recorded, context));
            }
        }

        for (key, current) in context.parameters.iter() {
            if MODULE_SELECTORS.contains(&key.as_str()) || RUN_CONTROLS.contains(&key.as_str()) {
                continue;
            }
            match self.get(key) {
                Some(recorded) if recorded != current => warn!(
                    "Parameter {} is '{}' in the parameter file but '{}' in the run; keeping '{}'",
                    key, current, recorded, recorded
                ),
                None => warn!("Parameter {} was not part of the run; ignoring it", key),
                _ => {}
            }
        }

        problems
    }

    state_conversions!(Parameters);
}

impl Module for Paths {
    const ROLE: Role = Role::Paths;

    fn build(context: &CheckContext<'_>) -> Result<Self, String> {
        Ok(context.paths.clone())
    }

    fn check(&self, context: &CheckContext<'_>) -> Vec<String> {
        let mut problems = Vec::new();

        for (key, path) in self.iter() {
            if !path.as_os_str().is_empty() && !path.is_absolute() {
                problems.push(format!("path {} is not absolute: {}", key, path.display()));
            }
        }

        for key in [OUTPUT_KEY, SCRATCH_KEY] {
            if !self.is_set(key) {
                problems.push(format!("path {} is not set", key));
            }
        }

        for (key, current) in context.paths.iter() {
            if EXEMPT_KEYS.contains(&key.as_str()) {
                continue;
            }
            if self.get(key) != context.paths.get(key) {
                warn!(
                    "Path {} is {} in the parameter file but differs in the run; keeping the run's",
                    key,
                    current.display()
                );
            }
        }

        problems
    }

    state_conversions!(Paths);
}
