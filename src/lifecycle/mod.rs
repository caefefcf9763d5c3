//! Lifecycle Module
//!
//! The operations a user invokes on a run directory and the pieces they
//! are built from.
//!
//! # Structure
//!
//! - [`controller`]: submit, resume, debug, clean, restart, check
//! - [`session`]: a populated registry plus its checkpoint store
//! - [`driver`]: hands a session to a compute backend, stage by stage
//! - [`prompt`]: confirmation prompts and the pre-flight summary
//! - [`clean`]: removal of derived artifacts
//! - [`shell`]: the debug inspector
//!
//! Only one operation may run against a run directory at a time. Nothing
//! here locks the directory; concurrent invocations give undefined results.

pub mod clean;
pub mod controller;
pub mod driver;
pub mod prompt;
pub mod session;
pub mod shell;

pub use controller::{Lifecycle, Outcome, RunOptions, DEFAULT_PARAMETER_FILE};
pub use driver::{Bookkeeping, Driver, RunSummary, SerialDriver, StageRunner};
pub use prompt::{AssumeYes, Prompt, TerminalPrompt};
pub use session::Session;
pub use shell::run_shell;
