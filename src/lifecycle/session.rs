//! A populated registry bound to the store it is checkpointed to.

use crate::checkpoint::CheckpointStore;
use crate::error::Result;
use crate::modules::{ModuleRegistry, WorkflowModule};

/// Live state of one run.
#[derive(Debug, Clone)]
pub struct Session {
    pub registry: ModuleRegistry,
    pub store: CheckpointStore,
}

impl Session {
    pub fn new(registry: ModuleRegistry, store: CheckpointStore) -> Self {
        Self { registry, store }
    }

    /// Persists every module as one checkpoint generation.
    pub fn checkpoint(&self) -> Result<()> {
        self.store.checkpoint(&self.registry)
    }

    pub fn workflow(&self) -> Result<&WorkflowModule> {
        Ok(self.registry.get_as::<WorkflowModule>()?)
    }
}
