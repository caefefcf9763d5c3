//! Parameter File Loading and Sanitizing
//!
//! The parameter file is a flat YAML mapping of upper-case keys to
//! scalars, plus the nested `PATHS` mapping. Users are allowed to keep
//! every key in the file and blank out the ones they do not need with
//! `null` or `""`; [`sanitize`] strips those so that defaults apply.
//!
//! # Example YAML Format
//!
//! ```yaml
//! TITLE: marmousi_inversion
//! WORKFLOW: inversion
//! BEGIN: 1
//! END: 5
//! RESUME_FROM: null
//! SMOOTH_H: 0
//! LINESEARCH: backtrack
//! PATHS:
//!   MODEL_INIT: ~/models/init
//!   DATA: ""
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SeisflowsError};

/// Key whose string value is capitalized during sanitizing.
pub const LINESEARCH_KEY: &str = "LINESEARCH";

/// Key holding the nested path mapping.
pub const PATHS_KEY: &str = "PATHS";

/// A raw value from the parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ParameterValue>),
    Map(BTreeMap<String, ParameterValue>),
}

impl ParameterValue {
    /// Returns true for the values that mean "not set": null and "".
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers are accepted wherever a float is expected.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// False when a float, or a float nested in a list or map, is NaN or
    /// infinite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::List(items) => items.iter().all(Self::is_finite),
            Self::Map(map) => map.values().all(Self::is_finite),
            _ => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ParameterValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// An ordered key/value view of the parameter file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    values: BTreeMap<String, ParameterValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Option<ParameterValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParameterValue> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.values.iter()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParameterValue::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ParameterValue::as_int)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ParameterValue::as_float)
    }

    /// Returns the string value for `key` or a message naming the key.
    pub fn require_str(&self, key: &str) -> std::result::Result<&str, String> {
        self.get_str(key)
            .ok_or_else(|| format!("parameter '{}' must be set to a string", key))
    }

    pub fn require_int(&self, key: &str) -> std::result::Result<i64, String> {
        self.get_int(key)
            .ok_or_else(|| format!("parameter '{}' must be set to an integer", key))
    }

    pub fn require_float(&self, key: &str) -> std::result::Result<f64, String> {
        self.get_float(key)
            .ok_or_else(|| format!("parameter '{}' must be set to a number", key))
    }

    /// Extracts the `PATHS` mapping as raw strings.
    ///
    /// Null entries become empty strings (the "unused path" sentinel).
    pub fn path_table(&self) -> Result<BTreeMap<String, String>> {
        let Some(value) = self.get(PATHS_KEY) else {
            return Err(SeisflowsError::config(format!(
                "parameter '{}' is missing",
                PATHS_KEY
            )));
        };

        let map = value.as_map().ok_or_else(|| {
            SeisflowsError::config(format!("parameter '{}' must be a mapping", PATHS_KEY))
        })?;

        map.iter()
            .map(|(key, value)| match value {
                ParameterValue::Null => Ok((key.clone(), String::new())),
                ParameterValue::String(s) => Ok((key.clone(), s.clone())),
                other => Err(SeisflowsError::config(format!(
                    "path '{}' must be a string, found '{}'",
                    key, other
                ))),
            })
            .collect()
    }
}

impl FromIterator<(String, ParameterValue)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Returns a sanitized copy of `parameters`.
///
/// - entries set to null or `""` are dropped
/// - everything else, including `false` and `0`, is kept as is
/// - a string `LINESEARCH` is capitalized (`backtrack` -> `Backtrack`)
///
/// The input is not modified and sanitizing is idempotent.
pub fn sanitize(parameters: &Parameters) -> Parameters {
    parameters
        .iter()
        .filter(|(_, value)| !value.is_unset())
        .map(|(key, value)| {
            let value = match value {
                ParameterValue::String(s) if key == LINESEARCH_KEY => {
                    ParameterValue::String(capitalize(s))
                }
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Loads the parameter file as a raw (unsanitized) mapping.
///
/// A missing file, an empty file, or YAML that is not a mapping is a
/// configuration error.
pub fn load_parameters(path: &Path) -> Result<Parameters> {
    if !path.is_file() {
        return Err(SeisflowsError::config(format!(
            "Parameter file not found: {}",
            path.display()
        )));
    }

    info!("Loading parameters from: {}", path.display());

    let content = fs::read_to_string(path)
        .map_err(|e| SeisflowsError::io(format!("read parameter file {}", path.display()), e))?;

    debug!("Parameter file loaded ({} bytes)", content.len());

    if content.trim().is_empty() {
        return Err(SeisflowsError::config(format!(
            "Parameter file is empty: {}",
            path.display()
        )));
    }

    let parameters: Parameters = serde_yaml::from_str(&content).map_err(|e| {
        SeisflowsError::config(format!(
            "Failed to parse parameter file '{}': {}",
            path.display(),
            e
        ))
    })?;

    info!("Parsed {} parameters", parameters.len());
    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn params(entries: &[(&str, ParameterValue)]) -> Parameters {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_sanitize_drops_null_and_empty_string() {
        let raw = params(&[
            ("RESUME_FROM", ParameterValue::Null),
            ("STOP_AFTER", "".into()),
            ("TITLE", "run".into()),
        ]);

        let sanitized = sanitize(&raw);

        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized.get_str("TITLE"), Some("run"));
        assert!(!sanitized.contains_key("RESUME_FROM"));
        assert!(!sanitized.contains_key("STOP_AFTER"));
    }

    #[test]
    fn test_sanitize_keeps_zero_and_false() {
        let raw = params(&[
            ("SMOOTH_H", 0i64.into()),
            ("SMOOTH_V", 0.0f64.into()),
            ("VERBOSE", false.into()),
        ]);

        let sanitized = sanitize(&raw);

        assert_eq!(sanitized, raw);
    }

    #[test]
    fn test_sanitize_capitalizes_linesearch() {
        let raw = params(&[("LINESEARCH", "backtrack".into())]);
        let sanitized = sanitize(&raw);
        assert_eq!(sanitized.get_str("LINESEARCH"), Some("Backtrack"));

        let raw = params(&[("LINESEARCH", "bRACKET".into())]);
        assert_eq!(sanitize(&raw).get_str("LINESEARCH"), Some("Bracket"));
    }

    #[test]
    fn test_sanitize_only_capitalizes_linesearch() {
        let raw = params(&[("CASE", "synthetic".into())]);
        assert_eq!(sanitize(&raw).get_str("CASE"), Some("synthetic"));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let raw = params(&[
            ("A", ParameterValue::Null),
            ("B", "".into()),
            ("C", 0i64.into()),
            ("D", false.into()),
            ("LINESEARCH", "BACKTRACK".into()),
            ("E", ParameterValue::List(vec![])),
        ]);

        let once = sanitize(&raw);
        let twice = sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitize_does_not_mutate_input() {
        let raw = params(&[("A", ParameterValue::Null), ("LINESEARCH", "fixed".into())]);
        let before = raw.clone();
        let _ = sanitize(&raw);
        assert_eq!(raw, before);
    }

    #[test]
    fn test_capitalize_empty_and_unicode() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("éCOLE"), "École");
    }

    #[test]
    fn test_load_parameters_yaml_types() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("parameters.yaml");
        std::fs::write(
            &path,
            r#"
TITLE: demo
BEGIN: 1
WALLTIME: 12.5
SMOOTH_H: 0
RESUME_FROM: null
STOP_AFTER: ""
VERBOSE: false
PATHS:
  MODEL_INIT: ~/model
  DATA: null
"#,
        )
        .unwrap();

        let parameters = load_parameters(&path).unwrap();

        assert_eq!(parameters.get_str("TITLE"), Some("demo"));
        assert_eq!(parameters.get_int("BEGIN"), Some(1));
        assert_eq!(parameters.get_float("WALLTIME"), Some(12.5));
        assert_eq!(parameters.get("SMOOTH_H"), Some(&ParameterValue::Integer(0)));
        assert_eq!(parameters.get("RESUME_FROM"), Some(&ParameterValue::Null));
        assert_eq!(parameters.get("VERBOSE"), Some(&ParameterValue::Bool(false)));

        let table = parameters.path_table().unwrap();
        assert_eq!(table["MODEL_INIT"], "~/model");
        assert_eq!(table["DATA"], "");
    }

    #[test]
    fn test_load_parameters_missing_file() {
        let result = load_parameters(Path::new("/nonexistent/parameters.yaml"));
        assert!(matches!(result, Err(SeisflowsError::Config(_))));
    }

    #[test]
    fn test_load_parameters_empty_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("parameters.yaml");
        std::fs::write(&path, "\n").unwrap();

        assert!(matches!(load_parameters(&path), Err(SeisflowsError::Config(_))));
    }

    #[test]
    fn test_load_parameters_not_a_mapping() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("parameters.yaml");
        std::fs::write(&path, "- just\n- a list\n").unwrap();

        assert!(matches!(load_parameters(&path), Err(SeisflowsError::Config(_))));
    }

    #[test]
    fn test_path_table_rejects_non_strings() {
        let mut inner = BTreeMap::new();
        inner.insert("DATA".to_string(), ParameterValue::Integer(3));
        let raw = params(&[(PATHS_KEY, ParameterValue::Map(inner))]);

        assert!(raw.path_table().is_err());
    }

    #[test]
    fn test_path_table_missing() {
        assert!(Parameters::new().path_table().is_err());
    }

    #[test]
    fn test_float_accepts_integer() {
        let raw = params(&[("WALLTIME", 30i64.into())]);
        assert_eq!(raw.get_float("WALLTIME"), Some(30.0));
        assert!(raw.require_str("WALLTIME").is_err());
    }
}
