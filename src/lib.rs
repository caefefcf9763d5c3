//! SeisFlows - Workflow Lifecycle and Checkpointing
//!
//! The command-line side of a seismic inversion workflow manager. It
//! turns a YAML parameter file into a set of stateful modules, persists
//! them to the run directory after every stage, and rebuilds them on
//! resume so a multi-day run survives interruptions and resubmission.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`config`]: Parameter loading, sanitizing, defaults and path resolution
//! - [`modules`]: Per-role module state and the registry holding it
//! - [`checkpoint`]: Durable, versioned records with journaled saves
//! - [`lifecycle`]: submit, resume, debug, clean, restart and check
//!
//! # Example
//!
//! ```rust,no_run
//! use seisflows::lifecycle::{AssumeYes, Lifecycle, RunOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = RunOptions::new("/scratch/marmousi");
//!     let mut lifecycle = Lifecycle::new(options, Box::new(AssumeYes));
//!
//!     // Pick up where the last submission stopped
//!     lifecycle.resume()?;
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod modules;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use checkpoint::CheckpointStore;
pub use config::{load_parameters, sanitize, Parameters, Paths};
pub use error::{Result, SeisflowsError};
pub use lifecycle::{Lifecycle, Outcome, RunOptions, Session};
pub use modules::{ModuleRegistry, ModuleState, Role};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "SeisFlows";
