//! Workflow Driver
//!
//! The system module's submit entry point. A driver walks the workflow's
//! stages from wherever the registry says the run is, checkpointing the
//! whole registry after every stage so an interruption loses at most the
//! stage in flight.
//!
//! The stage bodies themselves (solver runs, gradient processing, line
//! search math) belong to a [`StageRunner`].

use log::{error, info};

use super::session::Session;
use crate::error::{Result, SeisflowsError};
use crate::modules::{
    OptimizeModule, PostprocessModule, PreprocessModule, SolverModule, SystemKind, SystemModule,
    WorkflowModule,
};

/// What a driver did during one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Stages run during this submission
    pub stages_run: usize,

    /// Set when the run stopped early because of `STOP_AFTER`
    pub stopped_after: Option<String>,

    /// True once every iteration is done
    pub finished: bool,
}

/// Executes one workflow stage against the registry.
pub trait StageRunner {
    fn run_stage(&mut self, stage: &str, session: &mut Session) -> Result<()>;
}

/// Hands a populated session to a compute backend.
pub trait Driver {
    fn submit(&mut self, session: &mut Session) -> Result<RunSummary>;
}

/// Records stage effects on module counters without running any
/// external program.
#[derive(Debug, Default)]
pub struct Bookkeeping;

impl StageRunner for Bookkeeping {
    fn run_stage(&mut self, stage: &str, session: &mut Session) -> Result<()> {
        let registry = &mut session.registry;
        let ntask = registry.get_as::<SystemModule>()?.ntask.max(0) as u64;
        let iteration = registry.get_as::<WorkflowModule>()?.iteration;

        match stage {
            "initialize" | "setup" => {
                registry.get_mut_as::<OptimizeModule>()?.begin_iteration(iteration);
            }
            "evaluate_gradient" | "generate_synthetics" => {
                registry.get_mut_as::<SolverModule>()?.record_evaluations(ntask);
                registry.get_mut_as::<PreprocessModule>()?.processed_events += ntask;
            }
            "write_gradient" | "process_kernels" => {
                registry.get_mut_as::<PostprocessModule>()?.gradients += 1;
            }
            "line_search" => {
                registry.get_mut_as::<OptimizeModule>()?.record_step();
            }
            _ => {}
        }
        Ok(())
    }
}

/// Runs stages one after another in this process.
pub struct SerialDriver {
    runner: Box<dyn StageRunner>,
}

impl Default for SerialDriver {
    fn default() -> Self {
        Self::new(Box::new(Bookkeeping))
    }
}

impl SerialDriver {
    pub fn new(runner: Box<dyn StageRunner>) -> Self {
        Self { runner }
    }
}

impl Driver for SerialDriver {
    fn submit(&mut self, session: &mut Session) -> Result<RunSummary> {
        session.registry.get_mut_as::<SystemModule>()?.record_submission();
        session.checkpoint()?;

        let mut summary = RunSummary::default();

        loop {
            let workflow = session.workflow()?;
            if workflow.finished {
                break;
            }

            let iteration = workflow.iteration;
            let pending = workflow.pending_stages();
            info!(
                "Iteration {} of {}: {} stage(s) to run",
                iteration,
                workflow.end,
                pending.len()
            );

            for stage in pending {
                info!("Running stage: {}", stage);
                if let Err(e) = self.runner.run_stage(stage, session) {
                    error!("Stage '{}' of iteration {} failed: {}", stage, iteration, e);
                    return Err(e);
                }

                let workflow = session.registry.get_mut_as::<WorkflowModule>()?;
                workflow.complete_stage(stage);
                let stop = workflow.stops_after(stage);
                session.checkpoint()?;
                summary.stages_run += 1;

                if stop {
                    info!("Stopping after stage '{}' as requested", stage);
                    summary.stopped_after = Some(stage.to_string());
                    return Ok(summary);
                }
            }

            session.registry.get_mut_as::<WorkflowModule>()?.advance_iteration();
            session.checkpoint()?;
        }

        info!("Workflow finished after {} stage(s)", summary.stages_run);
        summary.finished = true;
        Ok(summary)
    }
}

/// Picks the driver for a system kind.
///
/// Only the serial backend runs in-process; schedulers are not supported.
pub fn for_system(kind: SystemKind) -> Result<Box<dyn Driver>> {
    match kind {
        SystemKind::Serial => Ok(Box::new(SerialDriver::default())),
        other => Err(SeisflowsError::Driver(format!(
            "system '{}' needs a job scheduler, which this build does not drive",
            other
        ))),
    }
}
