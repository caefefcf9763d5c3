//! Module Registry
//!
//! The explicit context object that maps each role to its live module.
//! It is built once per lifecycle operation and passed to whoever needs it.

use std::collections::BTreeMap;

use super::role::Role;
use super::state::{Module, ModuleState};
use crate::error::RegistryError;

/// Role to module mapping for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleRegistry {
    modules: BTreeMap<Role, ModuleState>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `state` under its own role, replacing any previous entry.
    pub fn set(&mut self, state: ModuleState) -> Option<ModuleState> {
        self.modules.insert(state.role(), state)
    }

    pub fn insert<T: Module>(&mut self, module: T) -> Option<ModuleState> {
        self.set(module.into_state())
    }

    pub fn get(&self, role: Role) -> Result<&ModuleState, RegistryError> {
        self.modules.get(&role).ok_or(RegistryError::NotFound(role))
    }

    /// Typed access to the module registered for `T::ROLE`.
    pub fn get_as<T: Module>(&self) -> Result<&T, RegistryError> {
        self.get(T::ROLE)
            .ok()
            .and_then(T::from_state)
            .ok_or(RegistryError::NotFound(T::ROLE))
    }

    pub fn get_mut_as<T: Module>(&mut self) -> Result<&mut T, RegistryError> {
        self.modules
            .get_mut(&T::ROLE)
            .and_then(T::from_state_mut)
            .ok_or(RegistryError::NotFound(T::ROLE))
    }

    pub fn contains(&self, role: Role) -> bool {
        self.modules.contains_key(&role)
    }

    /// Roles without a module, in [`Role::ALL`] order.
    pub fn missing_roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| !self.contains(*role))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_roles().is_empty()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &ModuleState)> {
        self.modules.iter().map(|(role, state)| (*role, state))
    }

    /// Builds a registry from already loaded states.
    pub fn from_states(states: impl IntoIterator<Item = ModuleState>) -> Self {
        let mut registry = Self::new();
        for state in states {
            registry.set(state);
        }
        registry
    }
}
