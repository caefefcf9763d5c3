//! Workflow Modules
//!
//! The stateful components a run is assembled from. Each occupies one
//! [`Role`]; together they are the state that checkpoints persist.
//!
//! # Structure
//!
//! - [`role`]: the fixed set of roles
//! - [`state`]: the `Module` trait and the tagged `ModuleState`
//! - [`registry`]: role to module mapping for one run
//! - [`system`], [`solver`], [`optimize`], [`preprocess`],
//!   [`postprocess`], [`workflow`]: the per-role modules

pub mod optimize;
pub mod postprocess;
pub mod preprocess;
pub mod registry;
pub mod role;
pub mod solver;
pub mod state;
pub mod system;
pub mod workflow;

pub use optimize::{LineSearch, OptimizeMethod, OptimizeModule};
pub use postprocess::{PostprocessKind, PostprocessModule};
pub use preprocess::{Misfit, PreprocessKind, PreprocessModule};
pub use registry::ModuleRegistry;
pub use role::Role;
pub use solver::{SolverKind, SolverModule};
pub use state::{CheckContext, Module, ModuleState};
pub use system::{SystemKind, SystemModule};
pub use workflow::{WorkflowKind, WorkflowModule};
