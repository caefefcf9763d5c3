//! Checkpoint Store
//!
//! Persists module state under the run's output directory, one record per
//! role at `seisflows_<role>.p`.
//!
//! Saving the whole registry is journaled so a crash never leaves a mix
//! of generations behind:
//!
//! 1. every record is staged as `seisflows_<role>.p.tmp`
//! 2. the commit marker `seisflows_checkpoint.commit` is written
//! 3. staged records are renamed over the live ones
//! 4. the marker is removed
//!
//! [`CheckpointStore::recover`] finishes step 3 when the marker exists and
//! otherwise discards staged records.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::record::CheckpointRecord;
use crate::error::{CorruptReason, RegistryError, Result, SeisflowsError};
use crate::modules::{ModuleRegistry, ModuleState, Role};

/// File name of the commit marker.
pub const COMMIT_MARKER: &str = "seisflows_checkpoint.commit";

const STAGED_SUFFIX: &str = ".tmp";

/// What [`CheckpointStore::recover`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// No interrupted checkpoint.
    Clean,

    /// An interrupted commit was finished; holds the records moved into place.
    RolledForward(usize),

    /// An uncommitted checkpoint was discarded; holds the records removed.
    RolledBack(usize),
}

/// Durable storage for module state in one output directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    output_dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn record_path(&self, role: Role) -> PathBuf {
        self.output_dir.join(format!("seisflows_{}.p", role))
    }

    fn staged_path(&self, role: Role) -> PathBuf {
        self.output_dir
            .join(format!("seisflows_{}.p{}", role, STAGED_SUFFIX))
    }

    fn marker_path(&self) -> PathBuf {
        self.output_dir.join(COMMIT_MARKER)
    }

    /// True if any role has a committed record.
    pub fn has_records(&self) -> bool {
        Role::ALL
            .into_iter()
            .any(|role| self.record_path(role).exists())
    }

    /// Writes a single role's record, replacing the previous one atomically.
    pub fn save(&self, state: &ModuleState) -> Result<PathBuf> {
        let role = state.role();
        let path = self.record_path(role);
        let staged = self.staged_path(role);

        self.ensure_output_dir()?;
        write_synced(&staged, &encode(state)?)?;
        fs::rename(&staged, &path)
            .map_err(|e| SeisflowsError::io(format!("replace {}", path.display()), e))?;

        debug!("Saved {} state to {}", role, path.display());
        Ok(path)
    }

    /// Reads the last committed record for `role`.
    pub fn load(&self, role: Role) -> Result<ModuleState> {
        let path = self.record_path(role);
        if !path.exists() {
            return Err(SeisflowsError::CheckpointMissing { role, path });
        }

        let corrupt = |reason: CorruptReason| SeisflowsError::CheckpointCorrupt {
            role,
            path: path.clone(),
            reason,
        };

        let bytes = fs::read(&path).map_err(|e| corrupt(CorruptReason::Unreadable(e.to_string())))?;
        let record = CheckpointRecord::decode(role, &bytes).map_err(corrupt)?;

        debug!(
            "Loaded {} state from {} (saved {})",
            role,
            path.display(),
            record.saved_at.to_rfc3339()
        );
        Ok(record.module)
    }

    /// Saves every role in `registry` as one generation.
    ///
    /// The registry must hold all roles; nothing is written otherwise.
    pub fn checkpoint(&self, registry: &ModuleRegistry) -> Result<()> {
        if let Some(role) = registry.missing_roles().first() {
            return Err(RegistryError::NotFound(*role).into());
        }

        let staged = self.stage(registry)?;
        self.write_marker()?;
        self.roll_forward()?;

        info!(
            "Checkpointed {} modules to {}",
            staged,
            self.output_dir.display()
        );
        Ok(())
    }

    /// Writes every record to its staged path. Returns how many were staged.
    pub(crate) fn stage(&self, registry: &ModuleRegistry) -> Result<usize> {
        self.ensure_output_dir()?;

        let mut count = 0;
        for (_, state) in registry.iter() {
            write_synced(&self.staged_path(state.role()), &encode(state)?)?;
            count += 1;
        }
        Ok(count)
    }

    /// Marks the staged generation as committed.
    pub(crate) fn write_marker(&self) -> Result<()> {
        let staged: Vec<&str> = Role::ALL
            .into_iter()
            .filter(|role| self.staged_path(*role).exists())
            .map(Role::name)
            .collect();
        write_synced(&self.marker_path(), staged.join("\n").as_bytes())
    }

    fn roll_forward(&self) -> Result<usize> {
        let mut moved = 0;
        for role in Role::ALL {
            let staged = self.staged_path(role);
            if staged.exists() {
                let path = self.record_path(role);
                fs::rename(&staged, &path)
                    .map_err(|e| SeisflowsError::io(format!("replace {}", path.display()), e))?;
                moved += 1;
            }
        }

        let marker = self.marker_path();
        fs::remove_file(&marker)
            .map_err(|e| SeisflowsError::io(format!("remove {}", marker.display()), e))?;
        Ok(moved)
    }

    fn roll_back(&self) -> Result<usize> {
        let mut removed = 0;
        for role in Role::ALL {
            let staged = self.staged_path(role);
            if staged.exists() {
                fs::remove_file(&staged)
                    .map_err(|e| SeisflowsError::io(format!("remove {}", staged.display()), e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Brings the store back to exactly one committed generation.
    pub fn recover(&self) -> Result<Recovery> {
        if !self.output_dir.is_dir() {
            return Ok(Recovery::Clean);
        }

        if self.marker_path().exists() {
            let moved = self.roll_forward()?;
            warn!(
                "Finished an interrupted checkpoint in {} ({} records)",
                self.output_dir.display(),
                moved
            );
            return Ok(Recovery::RolledForward(moved));
        }

        match self.roll_back()? {
            0 => Ok(Recovery::Clean),
            removed => {
                warn!(
                    "Discarded an incomplete checkpoint in {} ({} records)",
                    self.output_dir.display(),
                    removed
                );
                Ok(Recovery::RolledBack(removed))
            }
        }
    }

    /// Recovers, then loads every role.
    ///
    /// Fails on the first missing or corrupt record; a partial registry is
    /// never returned.
    pub fn load_all(&self) -> Result<ModuleRegistry> {
        self.recover()?;

        let mut states = Vec::with_capacity(Role::ALL.len());
        for role in Role::ALL {
            states.push(self.load(role)?);
        }

        info!(
            "Loaded {} modules from {}",
            states.len(),
            self.output_dir.display()
        );
        Ok(ModuleRegistry::from_states(states))
    }

    fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            SeisflowsError::io(format!("create {}", self.output_dir.display()), e)
        })
    }
}

fn encode(state: &ModuleState) -> Result<Vec<u8>> {
    CheckpointRecord::new(state.clone())
        .encode()
        .map_err(|e| SeisflowsError::io(format!("encode {} state", state.role()), e.into()))
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let context = || format!("write {}", path.display());
    let mut file = File::create(path).map_err(|e| SeisflowsError::io(context(), e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| SeisflowsError::io(context(), e))
}
