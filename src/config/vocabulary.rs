//! Parameter Vocabulary
//!
//! Every key the workflow understands, with the kind of value it takes and
//! what happens when it is absent after sanitizing: fall back to a
//! default, stay unset, or fail as a required key.

use log::warn;
use once_cell::sync::Lazy;

use super::parameters::{ParameterValue, Parameters, PATHS_KEY};
use crate::error::{Result, SeisflowsError};

/// The kind of value a key accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    /// Integers are accepted too.
    Float,
    String,
    Bool,
    Map,
}

impl ValueKind {
    fn accepts(self, value: &ParameterValue) -> bool {
        match self {
            Self::Integer => value.as_int().is_some(),
            Self::Float => value.as_float().is_some(),
            Self::String => value.as_str().is_some(),
            Self::Bool => value.as_bool().is_some(),
            Self::Map => value.as_map().is_some(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Integer => "an integer",
            Self::Float => "a number",
            Self::String => "a string",
            Self::Bool => "a boolean",
            Self::Map => "a mapping",
        }
    }
}

/// What an absent key means.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    /// Absence is a configuration error.
    Required,
    /// Absence means "not used".
    Optional,
    /// Absence means "use this value".
    Default(ParameterValue),
}

/// Declaration of a single parameter key.
#[derive(Debug, Clone)]
pub struct KeySpec {
    pub key: &'static str,
    pub kind: ValueKind,
    pub presence: Presence,
}

impl KeySpec {
    fn new(key: &'static str, kind: ValueKind, presence: Presence) -> Self {
        Self {
            key,
            kind,
            presence,
        }
    }
}

/// Keys that select which implementation fills a module role.
///
/// Changing one of these between a run and its resume is an error.
pub const MODULE_SELECTORS: &[&str] = &[
    "WORKFLOW",
    "SYSTEM",
    "SOLVER",
    "OPTIMIZE",
    "PREPROCESS",
    "POSTPROCESS",
];

/// Keys that steer a single invocation rather than describe the run.
///
/// On resume these are read from the current parameter file.
pub const RUN_CONTROLS: &[&str] = &["RESUME_FROM", "STOP_AFTER"];

/// The fixed parameter vocabulary.
pub static VOCABULARY: Lazy<Vec<KeySpec>> = Lazy::new(|| {
    use Presence::{Default, Optional, Required};
    use ValueKind::{Float, Integer, Map, String};

    vec![
        KeySpec::new("TITLE", String, Default("seisflows".into())),
        KeySpec::new("WORKFLOW", String, Default("inversion".into())),
        KeySpec::new("SYSTEM", String, Default("serial".into())),
        KeySpec::new("SOLVER", String, Default("specfem2d".into())),
        KeySpec::new("OPTIMIZE", String, Default("LBFGS".into())),
        KeySpec::new("PREPROCESS", String, Default("base".into())),
        KeySpec::new("POSTPROCESS", String, Default("base".into())),
        KeySpec::new("BEGIN", Integer, Default(1i64.into())),
        KeySpec::new("END", Integer, Required),
        KeySpec::new("RESUME_FROM", String, Optional),
        KeySpec::new("STOP_AFTER", String, Optional),
        KeySpec::new("NTASK", Integer, Default(1i64.into())),
        KeySpec::new("NPROC", Integer, Default(1i64.into())),
        KeySpec::new("WALLTIME", Float, Default(30.0f64.into())),
        KeySpec::new("CASE", String, Default("synthetic".into())),
        KeySpec::new("MISFIT", String, Default("waveform".into())),
        KeySpec::new("SMOOTH_H", Float, Default(0.0f64.into())),
        KeySpec::new("SMOOTH_V", Float, Default(0.0f64.into())),
        KeySpec::new("LINESEARCH", String, Default("Backtrack".into())),
        KeySpec::new("STEPCOUNTMAX", Integer, Default(10i64.into())),
        KeySpec::new("STEPLENINIT", Float, Default(0.05f64.into())),
        KeySpec::new(PATHS_KEY, Map, Required),
    ]
});

/// Looks up the declaration for `key`.
pub fn key_spec(key: &str) -> Option<&'static KeySpec> {
    VOCABULARY.iter().find(|spec| spec.key == key)
}

/// Lists every vocabulary violation in a sanitized mapping.
///
/// Unknown keys are not violations; they are only logged. NaN and the
/// infinities are rejected under every key since checkpoints cannot hold
/// them.
pub fn problems(parameters: &Parameters) -> Vec<String> {
    let mut problems = Vec::new();

    for spec in VOCABULARY.iter() {
        match parameters.get(spec.key) {
            Some(value) if !spec.kind.accepts(value) => problems.push(format!(
                "parameter '{}' must be {}, found '{}'",
                spec.key,
                spec.kind.name(),
                value
            )),
            Some(_) => {}
            None if spec.presence == Presence::Required => {
                problems.push(format!("required parameter '{}' is missing", spec.key))
            }
            None => {}
        }
    }

    for (key, value) in parameters.iter() {
        if !value.is_finite() {
            problems.push(format!(
                "parameter '{}' must hold finite numbers, found '{}'",
                key, value
            ));
        }
    }

    problems
}

/// Applies the vocabulary to a sanitized mapping.
///
/// Absent keys with a default are filled in, then the result is checked.
/// All problems are reported together as one configuration error.
pub fn apply_vocabulary(sanitized: &Parameters) -> Result<Parameters> {
    let mut resolved = sanitized.clone();

    for spec in VOCABULARY.iter() {
        if let Presence::Default(value) = &spec.presence {
            if !resolved.contains_key(spec.key) {
                resolved.insert(spec.key, value.clone());
            }
        }
    }

    for (key, _) in resolved.iter() {
        if key_spec(key).is_none() {
            warn!("Parameter '{}' is not recognised and is passed through", key);
        }
    }

    let problems = problems(&resolved);
    if !problems.is_empty() {
        return Err(SeisflowsError::config(problems.join("; ")));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn minimal() -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("END", 3i64);
        parameters.insert(PATHS_KEY, ParameterValue::Map(BTreeMap::new()));
        parameters
    }

    #[test]
    fn test_defaults_fill_absent_keys() {
        let resolved = apply_vocabulary(&minimal()).unwrap();

        assert_eq!(resolved.get_str("WORKFLOW"), Some("inversion"));
        assert_eq!(resolved.get_int("BEGIN"), Some(1));
        assert_eq!(resolved.get_float("STEPLENINIT"), Some(0.05));
        assert!(!resolved.contains_key("RESUME_FROM"));
    }

    #[test]
    fn test_explicit_values_win_over_defaults() {
        let mut parameters = minimal();
        parameters.insert("SMOOTH_H", 0i64);
        parameters.insert("NTASK", 4i64);

        let resolved = apply_vocabulary(&parameters).unwrap();

        assert_eq!(resolved.get("SMOOTH_H"), Some(&ParameterValue::Integer(0)));
        assert_eq!(resolved.get_int("NTASK"), Some(4));
    }

    #[test]
    fn test_required_key_missing() {
        let mut parameters = minimal();
        parameters.remove("END");

        let err = apply_vocabulary(&parameters).unwrap_err();
        assert!(err.to_string().contains("'END' is missing"));
    }

    #[test]
    fn test_wrong_kind_reported() {
        let mut parameters = minimal();
        parameters.insert("NTASK", "many");
        parameters.insert("WALLTIME", true);

        let err = apply_vocabulary(&parameters).unwrap_err().to_string();
        assert!(err.contains("'NTASK' must be an integer"));
        assert!(err.contains("'WALLTIME' must be a number"));
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let mut parameters = minimal();
        parameters.insert("SOMETHING_ELSE", 1i64);

        let resolved = apply_vocabulary(&parameters).unwrap();
        assert!(resolved.contains_key("SOMETHING_ELSE"));
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        let mut parameters = minimal();
        parameters.insert("WALLTIME", f64::INFINITY);
        parameters.insert(
            "EXTRA",
            ParameterValue::List(vec![ParameterValue::Float(f64::NAN)]),
        );

        let err = apply_vocabulary(&parameters).unwrap_err().to_string();
        assert!(err.contains("'WALLTIME' must hold finite numbers"));
        assert!(err.contains("'EXTRA' must hold finite numbers"));
    }

    #[test]
    fn test_every_selector_is_declared() {
        for selector in MODULE_SELECTORS {
            let spec = key_spec(selector).expect("selector in vocabulary");
            assert_eq!(spec.kind, ValueKind::String);
        }
    }
}
