//! Checkpoint Records
//!
//! The on-disk envelope around one role's state. Records are JSON so a
//! run directory can be inspected by hand.

use chrono::{DateTime, Utc};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CorruptReason;
use crate::modules::{ModuleState, Role};

/// Version of the record layout written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// One role's state as last checkpointed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub schema_version: u32,

    /// When the record was written (UTC)
    pub saved_at: DateTime<Utc>,

    pub module: ModuleState,
}

impl CheckpointRecord {
    pub fn new(module: ModuleState) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            module,
        }
    }

    pub fn role(&self) -> Role {
        self.module.role()
    }

    /// Fails on NaN or infinite fields, which JSON would write as `null`.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        let non_finite = self.module.non_finite_fields();
        if !non_finite.is_empty() {
            return Err(serde_json::Error::custom(format!(
                "{} state holds non-finite numbers in: {}",
                self.role(),
                non_finite.join(", ")
            )));
        }

        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Decodes a record stored for `expected`.
    ///
    /// The envelope is inspected before the module body so the error says
    /// which part is wrong: the schema version, the role, or the body.
    pub fn decode(expected: Role, bytes: &[u8]) -> Result<Self, CorruptReason> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| CorruptReason::Malformed(e.to_string()))?;

        let found = value
            .get("schema_version")
            .and_then(Value::as_u64)
            .ok_or_else(|| CorruptReason::Malformed("missing schema_version".to_string()))?;
        if found != u64::from(SCHEMA_VERSION) {
            return Err(CorruptReason::SchemaVersion {
                found,
                expected: SCHEMA_VERSION,
            });
        }

        let role_name = value
            .get("module")
            .and_then(|module| module.get("role"))
            .and_then(Value::as_str)
            .ok_or_else(|| CorruptReason::Malformed("missing module role".to_string()))?;
        let role: Role = role_name.parse().map_err(CorruptReason::Malformed)?;
        if role != expected {
            return Err(CorruptReason::RoleMismatch { found: role });
        }

        serde_json::from_value(value).map_err(|e| CorruptReason::Malformed(e.to_string()))
    }
}
