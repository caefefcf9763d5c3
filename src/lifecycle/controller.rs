//! Lifecycle Controller
//!
//! Implements the user-facing operations. Every operation that reads the
//! parameter file starts the same way (load, sanitize, apply defaults,
//! resolve paths) and then either builds fresh modules or reloads them
//! from the last checkpoint.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::clean::clean_run_directory;
use super::driver::{self, Driver, RunSummary};
use super::prompt::{clean_message, missing_paths_report, preflight_summary, Prompt};
use super::session::Session;
use crate::checkpoint::CheckpointStore;
use crate::config::paths::{absolutize, OUTPUT_KEY, SCRATCH_KEY};
use crate::config::{
    apply_vocabulary, load_parameters, missing_paths, resolve_paths, sanitize, Parameters, Paths,
};
use crate::error::{Result, SeisflowsError};
use crate::modules::{
    CheckContext, ModuleRegistry, ModuleState, Role, SystemModule, WorkflowModule,
};

/// Default parameter file name, relative to the working directory.
pub const DEFAULT_PARAMETER_FILE: &str = "parameters.yaml";

/// Name of the checkpoint directory inside the working directory.
pub const CHECKPOINT_DIR: &str = "output";

/// Where an operation runs and how it reads its parameters.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run directory
    pub workdir: PathBuf,

    /// Parameter file; relative paths are taken from `workdir`
    pub parameter_file: PathBuf,
}

impl RunOptions {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            parameter_file: PathBuf::from(DEFAULT_PARAMETER_FILE),
        }
    }

    pub fn with_parameter_file(mut self, parameter_file: impl Into<PathBuf>) -> Self {
        self.parameter_file = parameter_file.into();
        self
    }

    pub fn parameter_path(&self) -> PathBuf {
        absolutize(&self.parameter_file, &self.workdir)
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.workdir.join(CHECKPOINT_DIR)
    }
}

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The workflow was handed to the driver
    Ran(RunSummary),

    /// Configuration and modules validated; nothing was run
    Checked,

    /// Derived artifacts were removed
    Cleaned(Vec<PathBuf>),

    /// The user said no; nothing was changed
    Declined,
}

/// Sanitized parameters and resolved paths for the current invocation.
#[derive(Debug, Clone)]
struct Configuration {
    parameters: Parameters,
    paths: Paths,
}

impl Configuration {
    fn context(&self) -> CheckContext<'_> {
        CheckContext::new(&self.parameters, &self.paths)
    }
}

/// Runs lifecycle operations against one run directory.
pub struct Lifecycle {
    options: RunOptions,
    prompt: Box<dyn Prompt>,
    driver: Option<Box<dyn Driver>>,
}

impl Lifecycle {
    pub fn new(options: RunOptions, prompt: Box<dyn Prompt>) -> Self {
        Self {
            options,
            prompt,
            driver: None,
        }
    }

    /// Uses `driver` instead of the one the system module selects.
    pub fn with_driver(mut self, driver: Box<dyn Driver>) -> Self {
        self.driver = Some(driver);
        self
    }

    fn store(&self) -> CheckpointStore {
        CheckpointStore::new(self.options.checkpoint_dir())
    }

    /// Starts a new run from the parameter file.
    pub fn submit(&mut self) -> Result<Outcome> {
        let raw = load_parameters(&self.options.parameter_path())?;
        if !self.prompt.confirm(&preflight_summary(&raw))? {
            return Ok(Outcome::Declined);
        }

        let config = self.configure(&raw)?;

        let missing = missing_paths(&config.paths);
        if !missing.is_empty() {
            eprintln!("{}", missing_paths_report(&missing));
            return Err(SeisflowsError::PathValidation { missing });
        }

        self.create_run_directories(&config)?;
        let registry = build_modules(&config)?;

        let store = self.store();
        if store.has_records() {
            warn!(
                "Overwriting existing checkpoints in {}",
                store.output_dir().display()
            );
        }

        let mut session = Session::new(registry, store);
        session.checkpoint()?;
        let summary = self.dispatch(&mut session)?;
        Ok(Outcome::Ran(summary))
    }

    /// Continues the run recorded in the checkpoint directory.
    pub fn resume(&mut self) -> Result<Outcome> {
        let raw = load_parameters(&self.options.parameter_path())?;
        if !self.prompt.confirm(&preflight_summary(&raw))? {
            return Ok(Outcome::Declined);
        }

        let config = self.configure(&raw)?;
        let mut session = self.reload(&config)?;
        let summary = self.dispatch(&mut session)?;
        Ok(Outcome::Ran(summary))
    }

    /// Reloads the run for inspection without prompting or running it.
    pub fn debug(&mut self) -> Result<Session> {
        let raw = load_parameters(&self.options.parameter_path())?;
        let config = self.configure(&raw)?;
        self.reload(&config)
    }

    /// Removes output, logs and scratch from the run directory.
    pub fn clean(&mut self) -> Result<Outcome> {
        if !self.prompt.confirm(&clean_message())? {
            return Ok(Outcome::Declined);
        }

        let removed = clean_run_directory(&self.options.workdir, &self.options.parameter_path())?;
        info!(
            "Cleaned {} ({} entries removed)",
            self.options.workdir.display(),
            removed.len()
        );
        Ok(Outcome::Cleaned(removed))
    }

    /// Cleans, then submits. Declining the clean abandons the restart.
    pub fn restart(&mut self) -> Result<Outcome> {
        match self.clean()? {
            Outcome::Declined => Ok(Outcome::Declined),
            _ => self.submit(),
        }
    }

    /// Validates configuration, paths and module construction only.
    pub fn check(&mut self) -> Result<Outcome> {
        let raw = load_parameters(&self.options.parameter_path())?;
        let config = self.configure(&raw)?;

        let missing = missing_paths(&config.paths);
        if !missing.is_empty() {
            eprintln!("{}", missing_paths_report(&missing));
            return Err(SeisflowsError::PathValidation { missing });
        }

        let registry = build_modules(&config)?;
        info!("Configuration is valid ({} modules)", registry.len());
        Ok(Outcome::Checked)
    }

    fn configure(&self, raw: &Parameters) -> Result<Configuration> {
        let parameters = apply_vocabulary(&sanitize(raw))?;
        let mut paths = resolve_paths(&parameters.path_table()?, &self.options.workdir);
        paths.fill_run_defaults(&self.options.workdir);
        Ok(Configuration { parameters, paths })
    }

    fn create_run_directories(&self, config: &Configuration) -> Result<()> {
        let mut dirs = vec![self.options.workdir.clone(), self.options.checkpoint_dir()];
        for key in [OUTPUT_KEY, SCRATCH_KEY] {
            if let Some(dir) = config.paths.get(key) {
                dirs.push(dir.to_path_buf());
            }
        }

        for dir in dirs {
            fs::create_dir_all(&dir)
                .map_err(|e| SeisflowsError::io(format!("create {}", dir.display()), e))?;
        }
        Ok(())
    }

    /// Loads every role from the last checkpoint and re-validates it
    /// against the current configuration.
    fn reload(&self, config: &Configuration) -> Result<Session> {
        let store = self.store();
        let mut registry = store.load_all()?;

        registry
            .get_mut_as::<WorkflowModule>()?
            .apply_run_controls(&config.parameters);
        validate_modules(&registry, config)?;

        let workflow = registry.get_as::<WorkflowModule>()?;
        info!(
            "Reloaded {} workflow at iteration {} ({} stage(s) done)",
            workflow.kind,
            workflow.iteration,
            workflow.completed.len()
        );
        Ok(Session::new(registry, store))
    }

    fn dispatch(&mut self, session: &mut Session) -> Result<RunSummary> {
        if let Some(driver) = self.driver.as_mut() {
            return driver.submit(session);
        }
        let kind = session.registry.get_as::<SystemModule>()?.kind;
        driver::for_system(kind)?.submit(session)
    }
}

/// Builds and checks every module. The registry is only returned when all
/// of them are valid.
fn build_modules(config: &Configuration) -> Result<ModuleRegistry> {
    let context = config.context();
    let mut states = Vec::with_capacity(Role::ALL.len());

    for role in Role::ALL {
        let state = ModuleState::build(role, &context)
            .map_err(|message| SeisflowsError::ModuleValidation { role, message })?;
        states.push(state);
    }

    let registry = ModuleRegistry::from_states(states);
    validate_modules(&registry, config)?;
    Ok(registry)
}

fn validate_modules(registry: &ModuleRegistry, config: &Configuration) -> Result<()> {
    let context = config.context();
    for (role, state) in registry.iter() {
        let problems = state.check(&context);
        if !problems.is_empty() {
            return Err(SeisflowsError::ModuleValidation {
                role,
                message: problems.join("; "),
            });
        }
    }
    Ok(())
}

/// True when `workdir` holds a committed checkpoint.
pub fn has_checkpoint(workdir: &Path) -> bool {
    CheckpointStore::new(workdir.join(CHECKPOINT_DIR)).has_records()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::store::COMMIT_MARKER;
    use crate::lifecycle::prompt::AssumeYes;
    use crate::modules::{OptimizeModule, SolverModule};
    use crate::testing::{write_run_directory, ScriptedPrompt};
    use tempfile::tempdir;

    fn lifecycle(workdir: &Path) -> Lifecycle {
        Lifecycle::new(RunOptions::new(workdir), Box::new(AssumeYes))
    }

    #[test]
    fn test_missing_parameter_file_is_config_error() {
        let dir = tempdir().unwrap();
        let err = lifecycle(dir.path()).submit().unwrap_err();

        assert!(matches!(err, SeisflowsError::Config(_)));
        assert!(!dir.path().join("output").exists());
    }

    #[test]
    fn test_submit_runs_and_checkpoints() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");

        let outcome = lifecycle(dir.path()).submit().unwrap();

        match outcome {
            Outcome::Ran(summary) => assert!(summary.finished),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(dir.path().join("scratch").is_dir());
        for role in Role::ALL {
            assert!(dir
                .path()
                .join("output")
                .join(format!("seisflows_{}.p", role))
                .is_file());
        }
        assert!(!dir.path().join("output").join(COMMIT_MARKER).exists());
    }

    #[test]
    fn test_missing_path_aborts_before_output_exists() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "  DATA: ./observed\n");

        let err = lifecycle(dir.path()).submit().unwrap_err();

        match err {
            SeisflowsError::PathValidation { missing } => {
                assert_eq!(missing, vec![dir.path().join("observed")]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!dir.path().join("output").exists());
        assert!(!dir.path().join("scratch").exists());
    }

    #[test]
    fn test_declined_preflight_has_no_side_effects() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");

        let mut lifecycle = Lifecycle::new(
            RunOptions::new(dir.path()),
            Box::new(ScriptedPrompt::new(&[false])),
        );

        assert_eq!(lifecycle.submit().unwrap(), Outcome::Declined);
        assert!(!dir.path().join("output").exists());
    }

    #[test]
    fn test_invalid_module_aborts_submit() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");
        let path = dir.path().join(DEFAULT_PARAMETER_FILE);
        let text = fs::read_to_string(&path).unwrap().replace("NTASK: 2", "NTASK: 0");
        fs::write(&path, text).unwrap();

        let err = lifecycle(dir.path()).submit().unwrap_err();
        assert!(matches!(
            err,
            SeisflowsError::ModuleValidation {
                role: Role::System,
                ..
            }
        ));
        assert!(!has_checkpoint(dir.path()));
    }

    #[test]
    fn test_infinite_walltime_refused_before_checkpoint() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");
        let path = dir.path().join(DEFAULT_PARAMETER_FILE);
        let text = fs::read_to_string(&path)
            .unwrap()
            .replace("WALLTIME: 30.0", "WALLTIME: .inf")
            .replace("STOP_AFTER: ''", "STOP_AFTER: line_search");
        fs::write(&path, text).unwrap();

        let err = lifecycle(dir.path()).submit().unwrap_err();
        match err {
            SeisflowsError::Config(message) => assert!(message.contains("'WALLTIME'")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!has_checkpoint(dir.path()));
        assert!(matches!(
            lifecycle(dir.path()).resume().unwrap_err(),
            SeisflowsError::Config(_)
        ));
    }

    struct Unavailable;

    impl Driver for Unavailable {
        fn submit(&mut self, _session: &mut Session) -> Result<RunSummary> {
            Err(SeisflowsError::Driver("backend unavailable".to_string()))
        }
    }

    #[test]
    fn test_driver_failure_leaves_resumable_checkpoint() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");

        let err = lifecycle(dir.path())
            .with_driver(Box::new(Unavailable))
            .submit()
            .unwrap_err();
        assert!(matches!(err, SeisflowsError::Driver(_)));
        assert!(has_checkpoint(dir.path()));

        match lifecycle(dir.path()).resume().unwrap() {
            Outcome::Ran(summary) => assert!(summary.finished),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_resume_continues_stopped_run() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");
        let path = dir.path().join(DEFAULT_PARAMETER_FILE);
        let original = fs::read_to_string(&path).unwrap();
        fs::write(&path, original.replace("STOP_AFTER: ''", "STOP_AFTER: line_search")).unwrap();

        let first = lifecycle(dir.path()).submit().unwrap();
        match first {
            Outcome::Ran(summary) => {
                assert_eq!(summary.stopped_after.as_deref(), Some("line_search"))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        fs::write(&path, &original).unwrap();
        let second = lifecycle(dir.path()).resume().unwrap();
        match second {
            Outcome::Ran(summary) => {
                assert!(summary.finished);
                assert_eq!(summary.stages_run, 2 + 7);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let session = lifecycle(dir.path()).debug().unwrap();
        assert!(session.workflow().unwrap().finished);
        assert_eq!(
            session.registry.get_as::<SystemModule>().unwrap().submissions,
            2
        );
        assert_eq!(
            session.registry.get_as::<SolverModule>().unwrap().evaluations,
            4
        );
    }

    #[test]
    fn test_resume_without_checkpoint() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");

        let err = lifecycle(dir.path()).resume().unwrap_err();
        assert!(matches!(
            err,
            SeisflowsError::CheckpointMissing {
                role: Role::Parameters,
                ..
            }
        ));
    }

    #[test]
    fn test_resume_rejects_selector_drift() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");
        lifecycle(dir.path()).submit().unwrap();

        let path = dir.path().join(DEFAULT_PARAMETER_FILE);
        let text = fs::read_to_string(&path)
            .unwrap()
            .replace("OPTIMIZE: LBFGS", "OPTIMIZE: NLCG");
        fs::write(&path, text).unwrap();

        let err = lifecycle(dir.path()).resume().unwrap_err();
        assert!(matches!(
            err,
            SeisflowsError::ModuleValidation {
                role: Role::Parameters,
                ..
            }
        ));
    }

    #[test]
    fn test_debug_does_not_prompt() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");
        lifecycle(dir.path()).submit().unwrap();

        // Any confirmation would exhaust the script and fail.
        let mut lifecycle = Lifecycle::new(
            RunOptions::new(dir.path()),
            Box::new(ScriptedPrompt::new(&[])),
        );
        let session = lifecycle.debug().unwrap();
        assert!(session.registry.is_complete());
        assert_eq!(
            session.registry.get_as::<OptimizeModule>().unwrap().iteration,
            2
        );
    }

    #[test]
    fn test_clean_declined_and_accepted() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");
        lifecycle(dir.path()).submit().unwrap();
        fs::write(dir.path().join("seisflows.log"), "").unwrap();

        let mut declining = Lifecycle::new(
            RunOptions::new(dir.path()),
            Box::new(ScriptedPrompt::new(&[false])),
        );
        assert_eq!(declining.clean().unwrap(), Outcome::Declined);
        assert!(has_checkpoint(dir.path()));

        match lifecycle(dir.path()).clean().unwrap() {
            Outcome::Cleaned(removed) => assert_eq!(removed.len(), 3),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!has_checkpoint(dir.path()));
        assert!(dir.path().join(DEFAULT_PARAMETER_FILE).exists());
        assert!(dir.path().join("model_init").exists());
    }

    #[test]
    fn test_restart_starts_over() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");
        lifecycle(dir.path()).submit().unwrap();

        let outcome = lifecycle(dir.path()).restart().unwrap();
        assert!(matches!(outcome, Outcome::Ran(RunSummary { finished: true, .. })));

        let session = lifecycle(dir.path()).debug().unwrap();
        assert_eq!(
            session.registry.get_as::<SystemModule>().unwrap().submissions,
            1
        );
    }

    #[test]
    fn test_restart_declined_keeps_run() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");
        lifecycle(dir.path()).submit().unwrap();

        let mut lifecycle = Lifecycle::new(
            RunOptions::new(dir.path()),
            Box::new(ScriptedPrompt::new(&[false])),
        );
        assert_eq!(lifecycle.restart().unwrap(), Outcome::Declined);
        assert!(has_checkpoint(dir.path()));
    }

    #[test]
    fn test_check_creates_nothing() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");

        assert_eq!(lifecycle(dir.path()).check().unwrap(), Outcome::Checked);
        assert!(!dir.path().join("output").exists());
        assert!(!dir.path().join("scratch").exists());
    }

    #[test]
    fn test_relative_parameter_file_is_read_from_workdir() {
        let dir = tempdir().unwrap();
        write_run_directory(dir.path(), "");
        fs::rename(
            dir.path().join(DEFAULT_PARAMETER_FILE),
            dir.path().join("inversion.yaml"),
        )
        .unwrap();

        let options = RunOptions::new(dir.path()).with_parameter_file("inversion.yaml");
        assert_eq!(options.parameter_path(), dir.path().join("inversion.yaml"));

        let mut lifecycle = Lifecycle::new(options, Box::new(AssumeYes));
        assert_eq!(lifecycle.check().unwrap(), Outcome::Checked);
    }
}
