//! Run Directory Cleanup
//!
//! Removes what a run derives (output, logs, scratch) and nothing else.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Result, SeisflowsError};

/// True for top-level entries that `clean` removes.
fn is_derived(name: &str) -> bool {
    name.starts_with("output") || name.contains("log") || name == "scratch"
}

/// Deletes derived artifacts from `workdir`, never touching `parameter_file`.
///
/// Returns the removed paths in name order. A missing `workdir` is not an
/// error; there is simply nothing to clean.
pub fn clean_run_directory(workdir: &Path, parameter_file: &Path) -> Result<Vec<PathBuf>> {
    if !workdir.is_dir() {
        debug!("Nothing to clean in {}", workdir.display());
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(workdir)
        .map_err(|e| SeisflowsError::io(format!("list {}", workdir.display()), e))?;

    let mut targets = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SeisflowsError::io(format!("list {}", workdir.display()), e))?;
        let path = entry.path();
        if path == parameter_file {
            continue;
        }
        if is_derived(&entry.file_name().to_string_lossy()) {
            targets.push(path);
        }
    }
    targets.sort();

    for path in &targets {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| SeisflowsError::io(format!("remove {}", path.display()), e))?;
        info!("Removed {}", path.display());
    }

    Ok(targets)
}
