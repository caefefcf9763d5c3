//! Checkpoint Module
//!
//! Durable snapshots of every module's state, so a run can be resumed
//! after an interruption.
//!
//! # Structure
//!
//! - [`record`]: the versioned JSON envelope around one role's state
//! - [`store`]: per-role files, journaled whole-registry saves, recovery

pub mod record;
pub mod store;

pub use record::{CheckpointRecord, SCHEMA_VERSION};
pub use store::{CheckpointStore, Recovery};
