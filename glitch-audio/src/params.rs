//! Effect parameters and their schemas
//!
//! Every effect declares its parameters as a static `ParamSpec` table. The
//! table is the single source of truth for names, types, ranges and
//! defaults: effects clamp through it, the CLI lists it, presets are checked
//! against it. Values outside a spec are clamped, never rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors from parsing `key=value` parameter assignments
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("Expected key=value, got '{0}'")]
    Malformed(String),
    #[error("Empty parameter name in '{0}'")]
    EmptyName(String),
}

/// A single parameter value as supplied by a caller or preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Parse a command-line value: bool, then integer, then float, else text
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => return ParamValue::Bool(true),
            "false" | "no" | "off" => return ParamValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return ParamValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return ParamValue::Float(f);
        }
        ParamValue::Text(raw.to_string())
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Int(i) => Some(*i != 0),
            ParamValue::Float(f) => Some(*f != 0.0),
            ParamValue::Text(s) => match ParamValue::parse(s) {
                ParamValue::Bool(b) => Some(b),
                ParamValue::Text(_) => None,
                other => other.as_bool(),
            },
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Float(value as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Type and bounds of a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Float { min: f32, max: f32, default: f32 },
    Int { min: i64, max: i64, default: i64 },
    Bool { default: bool },
    Choice {
        choices: &'static [&'static str],
        default: &'static str,
    },
}

/// Declaration of one effect parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn float(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            kind: ParamKind::Float { min, max, default },
        }
    }

    pub const fn int(name: &'static str, min: i64, max: i64, default: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Int { min, max, default },
        }
    }

    pub const fn bool(name: &'static str, default: bool) -> Self {
        Self {
            name,
            kind: ParamKind::Bool { default },
        }
    }

    pub const fn choice(
        name: &'static str,
        choices: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Choice { choices, default },
        }
    }

    /// Clamp a float into this spec's range (non-finite input gives the default)
    pub fn clamp_float(&self, value: f32) -> f32 {
        match self.kind {
            ParamKind::Float { min, max, default } => {
                if value.is_finite() {
                    value.clamp(min, max)
                } else {
                    default
                }
            }
            ParamKind::Int { min, max, default } => {
                if value.is_finite() {
                    value.clamp(min as f32, max as f32)
                } else {
                    default as f32
                }
            }
            _ => value,
        }
    }

    /// Clamp an integer into this spec's range
    pub fn clamp_int(&self, value: i64) -> i64 {
        match self.kind {
            ParamKind::Int { min, max, .. } => value.clamp(min, max),
            ParamKind::Float { min, max, .. } => value.clamp(min as i64, max as i64),
            _ => value,
        }
    }

    /// Resolve a choice by name (case-insensitive); unknown names give the default
    pub fn resolve_choice(&self, value: &str) -> &'static str {
        match self.kind {
            ParamKind::Choice { choices, default } => {
                let wanted = value.trim();
                match choices.iter().find(|c| c.eq_ignore_ascii_case(wanted)) {
                    Some(choice) => *choice,
                    None => {
                        tracing::warn!(
                            param = self.name,
                            value,
                            fallback = default,
                            "unknown choice"
                        );
                        default
                    }
                }
            }
            _ => "",
        }
    }

    pub fn default_value(&self) -> ParamValue {
        match self.kind {
            ParamKind::Float { default, .. } => ParamValue::Float(default as f64),
            ParamKind::Int { default, .. } => ParamValue::Int(default),
            ParamKind::Bool { default } => ParamValue::Bool(default),
            ParamKind::Choice { default, .. } => ParamValue::Text(default.to_string()),
        }
    }

    pub fn default_float(&self) -> f32 {
        match self.kind {
            ParamKind::Float { default, .. } => default,
            ParamKind::Int { default, .. } => default as f32,
            ParamKind::Bool { default } => default as u8 as f32,
            ParamKind::Choice { .. } => 0.0,
        }
    }

    pub fn default_int(&self) -> i64 {
        match self.kind {
            ParamKind::Int { default, .. } => default,
            ParamKind::Float { default, .. } => default as i64,
            ParamKind::Bool { default } => default as i64,
            ParamKind::Choice { .. } => 0,
        }
    }

    pub fn default_bool(&self) -> bool {
        match self.kind {
            ParamKind::Bool { default } => default,
            _ => false,
        }
    }

    pub fn default_choice(&self) -> &'static str {
        match self.kind {
            ParamKind::Choice { default, .. } => default,
            _ => "",
        }
    }

    /// One-line human description, e.g. `feedback: float [0, 0.95] = 0.6`
    pub fn describe(&self) -> String {
        match self.kind {
            ParamKind::Float { min, max, default } => {
                format!("{}: float [{}, {}] = {}", self.name, min, max, default)
            }
            ParamKind::Int { min, max, default } => {
                format!("{}: int [{}, {}] = {}", self.name, min, max, default)
            }
            ParamKind::Bool { default } => format!("{}: bool = {}", self.name, default),
            ParamKind::Choice { choices, default } => {
                format!("{}: {} = {}", self.name, choices.join("|"), default)
            }
        }
    }
}

/// Named parameter values for one effect application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.0.insert(name.trim().to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Parse a list of `key=value` assignments
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self, ParamError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = ParamSet::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (key, value) = assignment
                .split_once('=')
                .ok_or_else(|| ParamError::Malformed(assignment.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ParamError::EmptyName(assignment.to_string()));
            }
            set.insert(key, ParamValue::parse(value));
        }
        Ok(set)
    }

    /// Float value for `spec`, clamped; `None` if absent or not numeric
    pub fn float(&self, spec: &ParamSpec) -> Option<f32> {
        let value = self.get(spec.name)?.as_f64()?;
        Some(spec.clamp_float(value as f32))
    }

    /// Integer value for `spec` (floats are rounded), clamped
    pub fn int(&self, spec: &ParamSpec) -> Option<i64> {
        let value = self.get(spec.name)?.as_f64()?;
        if !value.is_finite() {
            return None;
        }
        Some(spec.clamp_int(value.round() as i64))
    }

    pub fn bool(&self, spec: &ParamSpec) -> Option<bool> {
        self.get(spec.name)?.as_bool()
    }

    /// Choice value for `spec`; unknown strings resolve to the default
    pub fn choice(&self, spec: &ParamSpec) -> Option<&'static str> {
        match self.get(spec.name)? {
            ParamValue::Text(s) => Some(spec.resolve_choice(s)),
            other => Some(spec.resolve_choice(&other.to_string())),
        }
    }
}

impl FromIterator<(String, ParamValue)> for ParamSet {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEEDBACK: ParamSpec = ParamSpec::float("feedback", 0.0, 0.95, 0.6);
    const STAGES: ParamSpec = ParamSpec::int("stages", 1, 12, 4);
    const SHAPE: ParamSpec = ParamSpec::choice("shape", &["sine", "square"], "sine");
    const SYNC: ParamSpec = ParamSpec::bool("sync", false);

    #[test]
    fn test_parse_values() {
        assert_eq!(ParamValue::parse("true"), ParamValue::Bool(true));
        assert_eq!(ParamValue::parse("12"), ParamValue::Int(12));
        assert_eq!(ParamValue::parse("-0.5"), ParamValue::Float(-0.5));
        assert_eq!(ParamValue::parse("sine"), ParamValue::Text("sine".into()));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let params = ParamSet::new().with("feedback", 3.0).with("stages", 40);
        assert_eq!(params.float(&FEEDBACK), Some(0.95));
        assert_eq!(params.int(&STAGES), Some(12));

        let params = ParamSet::new().with("feedback", -1.0).with("stages", 0);
        assert_eq!(params.float(&FEEDBACK), Some(0.0));
        assert_eq!(params.int(&STAGES), Some(1));
    }

    #[test]
    fn test_non_finite_falls_back_to_default() {
        let params = ParamSet::new().with("feedback", f64::NAN);
        assert_eq!(params.float(&FEEDBACK), Some(0.6));
    }

    #[test]
    fn test_missing_key_is_none() {
        let params = ParamSet::new();
        assert_eq!(params.float(&FEEDBACK), None);
        assert_eq!(params.choice(&SHAPE), None);
    }

    #[test]
    fn test_choices_resolve_case_insensitively() {
        let params = ParamSet::new().with("shape", "SQUARE");
        assert_eq!(params.choice(&SHAPE), Some("square"));
        let params = ParamSet::new().with("shape", "wobble");
        assert_eq!(params.choice(&SHAPE), Some("sine"));
    }

    #[test]
    fn test_bool_from_numbers_and_text() {
        assert_eq!(ParamSet::new().with("sync", 1).bool(&SYNC), Some(true));
        assert_eq!(ParamSet::new().with("sync", "off").bool(&SYNC), Some(false));
    }

    #[test]
    fn test_from_assignments() {
        let params = ParamSet::from_assignments(["feedback=0.5", " shape = square "]).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.float(&FEEDBACK), Some(0.5));
        assert_eq!(params.choice(&SHAPE), Some("square"));

        assert!(matches!(
            ParamSet::from_assignments(["feedback"]),
            Err(ParamError::Malformed(_))
        ));
        assert!(matches!(
            ParamSet::from_assignments(["=3"]),
            Err(ParamError::EmptyName(_))
        ));
    }

    #[test]
    fn test_json_shape() {
        let params: ParamSet =
            serde_json::from_str(r#"{"feedback": 0.5, "stages": 3, "shape": "square", "sync": true}"#)
                .unwrap();
        assert_eq!(params.get("stages"), Some(&ParamValue::Int(3)));
        assert_eq!(params.get("sync"), Some(&ParamValue::Bool(true)));
        assert_eq!(params.float(&FEEDBACK), Some(0.5));
    }

    #[test]
    fn test_describe() {
        assert_eq!(FEEDBACK.describe(), "feedback: float [0, 0.95] = 0.6");
        assert_eq!(SHAPE.describe(), "shape: sine|square = sine");
    }
}
