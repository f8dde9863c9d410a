//! Rule contract
//!
//! A rule is one checkable convention. It sees only the neutral source model
//! and its own resolved parameters, and returns violations.

use crate::diagnostic::{Location, Severity, Violation};
use crate::model::SourceFile;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Rule category for grouping related rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// Line length and vertical spacing
    Layout,
    /// Casing and naming vocabulary
    Naming,
    /// Block shape and member ordering
    #[default]
    Structure,
    /// Readability hints
    Clarity,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCategory::Layout => write!(f, "layout"),
            RuleCategory::Naming => write!(f, "naming"),
            RuleCategory::Structure => write!(f, "structure"),
            RuleCategory::Clarity => write!(f, "clarity"),
        }
    }
}

impl std::str::FromStr for RuleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "layout" => Ok(RuleCategory::Layout),
            "naming" => Ok(RuleCategory::Naming),
            "structure" => Ok(RuleCategory::Structure),
            "clarity" => Ok(RuleCategory::Clarity),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Type of a rule parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Boolean,
    String,
    StringList,
    /// Mapping of string keys to string values
    StringMap,
}

impl ParamKind {
    /// Whether a JSON value has this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::String => value.is_string(),
            ParamKind::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            ParamKind::StringMap => value
                .as_object()
                .is_some_and(|map| map.values().all(Value::is_string)),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Integer => write!(f, "integer"),
            ParamKind::Boolean => write!(f, "boolean"),
            ParamKind::String => write!(f, "string"),
            ParamKind::StringList => write!(f, "list of strings"),
            ParamKind::StringMap => write!(f, "map of strings"),
        }
    }
}

/// Schema entry for one parameter
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }
}

/// Parameter values for one rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleParams(Map<String, Value>);

impl RuleParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn usize(&self, name: &str) -> Option<usize> {
        self.get(name)
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn string_list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn string_map(&self, name: &str) -> BTreeMap<String, String> {
        self.get(name)
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deep-merge `other` on top of these params. Nested maps merge key by
    /// key; every other value is replaced.
    pub fn merge(&mut self, other: &RuleParams) {
        for (key, value) in &other.0 {
            match self.0.get_mut(key) {
                Some(existing) => merge_value(existing, value),
                None => {
                    self.0.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

fn merge_value(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Error raised by a rule while checking a file or validating params
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{0}")]
    Failed(String),

    #[error("rule panicked: {0}")]
    Panicked(String),

    #[error("invalid parameter '{param}': {message}")]
    InvalidParam { param: String, message: String },
}

impl RuleError {
    pub fn invalid_param(param: &str, message: impl Into<String>) -> Self {
        RuleError::InvalidParam {
            param: param.to_string(),
            message: message.into(),
        }
    }
}

/// What a rule sees while checking one file
pub struct RuleContext<'a> {
    pub file: &'a SourceFile,
    pub params: &'a RuleParams,
    /// Resolved severity for the rule
    pub severity: Severity,
}

impl<'a> RuleContext<'a> {
    pub fn new(file: &'a SourceFile, params: &'a RuleParams, severity: Severity) -> Self {
        Self {
            file,
            params,
            severity,
        }
    }

    /// Build a violation at a position of the checked file
    pub fn violation(
        &self,
        rule_id: &str,
        severity: Severity,
        line: usize,
        column: usize,
        message: &str,
    ) -> Violation {
        let location = Location::new(self.file.path.clone(), line, column);
        let violation = Violation::new(rule_id, severity, message, location);
        match self.file.source_line(line) {
            Some(text) => violation.with_source_line(text),
            None => violation,
        }
    }
}

/// A checkable convention
pub trait Rule: Send + Sync {
    /// Unique rule identifier (e.g., "line-length")
    fn id(&self) -> &'static str;

    /// One-line description
    fn description(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    /// Heuristic rules whose configured severity is clamped to warning
    fn is_advisory(&self) -> bool {
        false
    }

    /// Parameter schema
    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn default_params(&self) -> RuleParams {
        RuleParams::default()
    }

    /// Rule-specific checks beyond the schema (threshold order, regex syntax)
    fn validate(&self, _params: &RuleParams) -> Result<(), RuleError> {
        Ok(())
    }

    /// Check one file
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError>;
}

/// Check param names and types against a rule's schema, then run the rule's
/// own validation
pub fn validate_params(rule: &dyn Rule, params: &RuleParams) -> Result<(), RuleError> {
    let schema = rule.params();
    for (name, value) in params.iter() {
        let spec = schema
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| RuleError::invalid_param(name, "unknown parameter"))?;
        if !spec.kind.accepts(value) {
            return Err(RuleError::invalid_param(
                name,
                format!("expected {}", spec.kind),
            ));
        }
    }
    rule.validate(params)
}

/// Soft/hard threshold pair shared by the two-tier rules
pub fn thresholds(params: &RuleParams) -> Result<(usize, usize), RuleError> {
    let soft = params
        .usize("soft")
        .ok_or_else(|| RuleError::invalid_param("soft", "missing"))?;
    let hard = params
        .usize("hard")
        .ok_or_else(|| RuleError::invalid_param("hard", "missing"))?;
    if soft > hard {
        return Err(RuleError::invalid_param(
            "soft",
            format!("soft threshold {} is greater than hard threshold {}", soft, hard),
        ));
    }
    Ok((soft, hard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Dummy;

    impl Rule for Dummy {
        fn id(&self) -> &'static str {
            "dummy"
        }

        fn description(&self) -> &'static str {
            "test rule"
        }

        fn category(&self) -> RuleCategory {
            RuleCategory::Layout
        }

        fn params(&self) -> &'static [ParamSpec] {
            const PARAMS: &[ParamSpec] = &[
                ParamSpec::new("soft", ParamKind::Integer, "soft limit"),
                ParamSpec::new("hard", ParamKind::Integer, "hard limit"),
                ParamSpec::new("words", ParamKind::StringList, "words"),
            ];
            PARAMS
        }

        fn validate(&self, params: &RuleParams) -> Result<(), RuleError> {
            thresholds(params).map(|_| ())
        }

        fn check(&self, _ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_category_roundtrip() {
        assert_eq!("naming".parse::<RuleCategory>(), Ok(RuleCategory::Naming));
        assert_eq!(RuleCategory::Clarity.to_string(), "clarity");
        assert!("bogus".parse::<RuleCategory>().is_err());
    }

    #[test]
    fn test_param_kinds() {
        assert!(ParamKind::Integer.accepts(&json!(3)));
        assert!(!ParamKind::Integer.accepts(&json!("3")));
        assert!(ParamKind::StringList.accepts(&json!(["get", "set"])));
        assert!(!ParamKind::StringList.accepts(&json!(["get", 1])));
        assert!(ParamKind::StringMap.accepts(&json!({"class": "^[A-Z]"})));
    }

    #[test]
    fn test_deep_merge() {
        let mut base = RuleParams::new()
            .with("soft", 80)
            .with("patterns", json!({"class": "A", "method": "B"}));
        let overlay = RuleParams::new()
            .with("soft", 100)
            .with("patterns", json!({"method": "C"}));
        base.merge(&overlay);

        assert_eq!(base.usize("soft"), Some(100));
        let patterns = base.string_map("patterns");
        assert_eq!(patterns["class"], "A");
        assert_eq!(patterns["method"], "C");
    }

    #[test]
    fn test_validate_params() {
        let ok = RuleParams::new().with("soft", 10).with("hard", 20);
        assert!(validate_params(&Dummy, &ok).is_ok());

        let unknown = ok.clone().with("bogus", 1);
        assert_eq!(
            validate_params(&Dummy, &unknown),
            Err(RuleError::invalid_param("bogus", "unknown parameter"))
        );

        let wrong_type = ok.clone().with("words", "get");
        assert!(matches!(
            validate_params(&Dummy, &wrong_type),
            Err(RuleError::InvalidParam { param, .. }) if param == "words"
        ));

        let inverted = RuleParams::new().with("soft", 30).with("hard", 20);
        assert!(validate_params(&Dummy, &inverted).is_err());
    }
}
