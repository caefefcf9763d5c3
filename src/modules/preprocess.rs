//! Preprocessing Module
//!
//! Waveform processing and misfit selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::role::Role;
use super::state::{kind_drift, parse_selector, state_conversions, CheckContext, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessKind {
    Base,
    Pyatoa,
}

impl PreprocessKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Pyatoa => "pyatoa",
        }
    }
}

impl fmt::Display for PreprocessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PreprocessKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" | "default" => Ok(Self::Base),
            "pyatoa" => Ok(Self::Pyatoa),
            _ => Err(format!("unknown preprocessing module '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Misfit {
    Waveform,
    Traveltime,
    Envelope,
}

impl fmt::Display for Misfit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Waveform => "waveform",
            Self::Traveltime => "traveltime",
            Self::Envelope => "envelope",
        };
        f.write_str(name)
    }
}

impl FromStr for Misfit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "waveform" => Ok(Self::Waveform),
            "traveltime" => Ok(Self::Traveltime),
            "envelope" => Ok(Self::Envelope),
            _ => Err(format!("unknown misfit '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessModule {
    pub kind: PreprocessKind,
    pub misfit: Misfit,

    /// Source events whose traces have been processed
    #[serde(default)]
    pub processed_events: u64,
}

impl Module for PreprocessModule {
    const ROLE: Role = Role::Preprocess;

    fn build(context: &CheckContext<'_>) -> Result<Self, String> {
        Ok(Self {
            kind: parse_selector(context.parameters, "PREPROCESS")?,
            misfit: parse_selector(context.parameters, "MISFIT")?,
            processed_events: 0,
        })
    }

    fn check(&self, context: &CheckContext<'_>) -> Vec<String> {
        kind_drift("PREPROCESS", self.kind, context).into_iter().collect()
    }

    state_conversions!(Preprocess);
}
