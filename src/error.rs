//! Error Types
//!
//! A single error enum covers every way a lifecycle operation can fail.
//! None of these are retried; they propagate to `main`, which reports
//! them and exits with a failure status.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::modules::Role;

/// Why a checkpoint record could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorruptReason {
    /// The file exists but could not be read back.
    #[error("record could not be read: {0}")]
    Unreadable(String),

    /// The bytes are not a well-formed record.
    #[error("record is malformed: {0}")]
    Malformed(String),

    /// The record was written by an incompatible schema.
    #[error("schema version {found} does not match expected version {expected}")]
    SchemaVersion { found: u64, expected: u32 },

    /// The record holds state for a different role.
    #[error("record holds state for module '{found}'")]
    RoleMismatch { found: Role },
}

/// Lookup failures in the module registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("module '{0}' has not been registered")]
    NotFound(Role),
}

/// Top-level error for all lifecycle operations.
#[derive(Debug, Error)]
pub enum SeisflowsError {
    /// Parameter file missing, or a key missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Required paths that do not exist on disk.
    #[error("{} required path(s) do not exist", missing.len())]
    PathValidation { missing: Vec<PathBuf> },

    #[error("no checkpoint for module '{role}' at {}", path.display())]
    CheckpointMissing { role: Role, path: PathBuf },

    #[error("checkpoint for module '{role}' at {} is corrupt: {reason}", path.display())]
    CheckpointCorrupt {
        role: Role,
        path: PathBuf,
        reason: CorruptReason,
    },

    /// A module's own parameter check failed.
    #[error("module '{role}' failed validation: {message}")]
    ModuleValidation { role: Role, message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The workflow driver stopped with an error.
    #[error("workflow driver failed: {0}")]
    Driver(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl SeisflowsError {
    /// Wraps an I/O error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SeisflowsError>;
