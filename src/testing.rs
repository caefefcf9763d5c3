//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use crate::config::{apply_vocabulary, resolve_paths, sanitize, Parameters, Paths};
use crate::error::{Result, SeisflowsError};
use crate::lifecycle::Prompt;
use crate::modules::{CheckContext, ModuleRegistry, ModuleState, Role};

/// Parameter file used by the fixtures. `PATHS` comes last so tests can
/// append entries to it.
const PARAMETER_FILE: &str = "\
TITLE: test_inversion
WORKFLOW: inversion
SYSTEM: serial
SOLVER: specfem2d
OPTIMIZE: LBFGS
PREPROCESS: base
POSTPROCESS: base
BEGIN: 1
END: 2
RESUME_FROM:
STOP_AFTER: ''
NTASK: 2
NPROC: 1
WALLTIME: 30.0
CASE: synthetic
MISFIT: waveform
SMOOTH_H: 0.0
SMOOTH_V: 0.0
LINESEARCH: backtrack
STEPCOUNTMAX: 10
STEPLENINIT: 0.05
PATHS:
  MODEL_INIT: model_init
  OUTPUT:
  SCRATCH: ''
";

/// Sanitized parameters and paths resolved against `/work/run`.
pub fn sample_configuration() -> (Parameters, Paths) {
    let raw: Parameters = serde_yaml::from_str(PARAMETER_FILE).unwrap();
    let parameters = apply_vocabulary(&sanitize(&raw)).unwrap();

    let workdir = Path::new("/work/run");
    let mut paths = resolve_paths(&parameters.path_table().unwrap(), workdir);
    paths.fill_run_defaults(workdir);

    (parameters, paths)
}

/// A registry with every role built from [`sample_configuration`].
pub fn sample_registry() -> ModuleRegistry {
    let (parameters, paths) = sample_configuration();
    let context = CheckContext::new(&parameters, &paths);
    ModuleRegistry::from_states(
        Role::ALL
            .into_iter()
            .map(|role| ModuleState::build(role, &context).unwrap()),
    )
}

/// Writes the fixture parameter file and starting model into `workdir`.
///
/// `extra_paths` is appended to the `PATHS` block verbatim.
pub fn write_run_directory(workdir: &Path, extra_paths: &str) {
    fs::create_dir_all(workdir.join("model_init")).unwrap();
    fs::write(
        workdir.join("parameters.yaml"),
        format!("{}{}", PARAMETER_FILE, extra_paths),
    )
    .unwrap();
}

/// Answers confirmations from a fixed script.
pub struct ScriptedPrompt {
    answers: VecDeque<bool>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        self.answers
            .pop_front()
            .ok_or_else(|| SeisflowsError::config(format!("unexpected prompt: {}", message)))
    }
}
