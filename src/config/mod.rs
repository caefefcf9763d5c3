//! Configuration Module
//!
//! Turns the user's parameter file into the canonical form the rest of
//! the system reads.
//!
//! # Structure
//!
//! - [`parameters`]: YAML loading and the sanitizer
//! - [`vocabulary`]: known keys, their kinds and defaults
//! - [`paths`]: `~` expansion, absolutization, existence checks

pub mod parameters;
pub mod paths;
pub mod vocabulary;

pub use parameters::{load_parameters, sanitize, ParameterValue, Parameters};
pub use paths::{missing_paths, resolve_paths, Paths};
pub use vocabulary::{apply_vocabulary, MODULE_SELECTORS, RUN_CONTROLS};
