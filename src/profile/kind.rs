//! Value kinds for config keys and the display normalization they imply.
//!
//! The kind of a key is not stored in profile documents; it comes from a
//! definitions file mapping key names to slicer option types such as
//! `coFloats` or `coPercent`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::error::{ProfileError, ProfileResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Bool,
    Percent,
    FloatOrPercent,
    Point,
    Point3,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueKind {
    pub scalar: ScalarKind,
    pub list: bool,
}

impl ValueKind {
    pub fn scalar(scalar: ScalarKind) -> Self {
        Self {
            scalar,
            list: false,
        }
    }

    pub fn list(scalar: ScalarKind) -> Self {
        Self { scalar, list: true }
    }

    /// Maps a slicer option type name (`coFloat`, `coBools`, ...) to a kind.
    pub fn from_option_type(option_type: &str) -> Option<Self> {
        let kind = match option_type.trim() {
            "coString" => Self::scalar(ScalarKind::String),
            "coStrings" => Self::list(ScalarKind::String),
            "coInt" => Self::scalar(ScalarKind::Int),
            "coInts" => Self::list(ScalarKind::Int),
            "coFloat" => Self::scalar(ScalarKind::Float),
            "coFloats" => Self::list(ScalarKind::Float),
            "coBool" => Self::scalar(ScalarKind::Bool),
            "coBools" => Self::list(ScalarKind::Bool),
            "coPercent" => Self::scalar(ScalarKind::Percent),
            "coPercents" => Self::list(ScalarKind::Percent),
            "coFloatOrPercent" => Self::scalar(ScalarKind::FloatOrPercent),
            "coFloatsOrPercents" => Self::list(ScalarKind::FloatOrPercent),
            "coPoint" => Self::scalar(ScalarKind::Point),
            "coPoints" => Self::list(ScalarKind::Point),
            "coPoint3" => Self::scalar(ScalarKind::Point3),
            "coEnum" => Self::scalar(ScalarKind::Enum),
            "coEnums" => Self::list(ScalarKind::Enum),
            _ => return None,
        };
        Some(kind)
    }

    /// Display form of a stored value. Anything that cannot be interpreted
    /// as this kind is returned unchanged.
    pub fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Array(items) if self.list => Value::Array(
                items
                    .iter()
                    .map(|item| normalize_scalar(self.scalar, item))
                    .collect(),
            ),
            other => normalize_scalar(self.scalar, other),
        }
    }
}

fn normalize_scalar(kind: ScalarKind, value: &Value) -> Value {
    let normalized = match kind {
        ScalarKind::Percent => normalize_percent(value),
        ScalarKind::Bool => normalize_bool(value),
        _ => None,
    };
    normalized.unwrap_or_else(|| value.clone())
}

/// Clamps to `[0, 100]` and renders as an integer string.
pub fn normalize_percent(value: &Value) -> Option<Value> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().trim_end_matches('%').trim().parse().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    let clamped = number.clamp(0.0, 100.0).round() as i64;
    Some(Value::String(clamped.to_string()))
}

/// Booleans are carried as `"1"` / `"0"` so lists of bools round-trip as
/// lists of strings.
pub fn normalize_bool(value: &Value) -> Option<Value> {
    let flag = match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => match number.as_i64()? {
            0 => false,
            1 => true,
            _ => return None,
        },
        Value::String(text) => match text.trim() {
            "1" | "true" => true,
            "0" | "false" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(Value::String(if flag { "1" } else { "0" }.to_string()))
}

/// Reading of a float-or-percent value: the number and whether the trailing
/// `%` marks it as relative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatOrPercent {
    pub value: f64,
    pub percent: bool,
}

impl FloatOrPercent {
    pub fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(Self {
                value: number.as_f64()?,
                percent: false,
            }),
            Value::String(text) => {
                let text = text.trim();
                let (digits, percent) = match text.strip_suffix('%') {
                    Some(digits) => (digits.trim(), true),
                    None => (text, false),
                };
                Some(Self {
                    value: digits.parse().ok()?,
                    percent,
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyDefinition {
    pub kind: Option<ValueKind>,
    pub tooltip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDefinition {
    #[serde(default, rename = "type")]
    option_type: Option<String>,
    #[serde(default)]
    tooltip: Option<String>,
}

/// Key name → kind lookup loaded from a definitions file.
#[derive(Debug, Clone, Default)]
pub struct KindDictionary {
    definitions: HashMap<String, KeyDefinition>,
}

impl KindDictionary {
    pub fn load(path: &Path) -> ProfileResult<Self> {
        let contents = fs::read_to_string(path).map_err(|err| ProfileError::io(path, err))?;
        Self::from_json(&contents).map_err(|err| ProfileError::json(path, err))
    }

    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        let raw: HashMap<String, RawDefinition> = serde_json::from_str(contents)?;
        let definitions = raw
            .into_iter()
            .map(|(key, definition)| {
                let kind = definition
                    .option_type
                    .as_deref()
                    .and_then(ValueKind::from_option_type);
                (
                    key,
                    KeyDefinition {
                        kind,
                        tooltip: definition.tooltip,
                    },
                )
            })
            .collect();
        Ok(Self { definitions })
    }

    pub fn insert(&mut self, key: &str, kind: ValueKind) {
        self.definitions.entry(key.to_string()).or_default().kind = Some(kind);
    }

    pub fn kind(&self, key: &str) -> Option<ValueKind> {
        self.definitions.get(key).and_then(|definition| definition.kind)
    }

    pub fn tooltip(&self, key: &str) -> Option<&str> {
        self.definitions
            .get(key)
            .and_then(|definition| definition.tooltip.as_deref())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn normalize(&self, key: &str, value: &Value) -> Value {
        match self.kind(key) {
            Some(kind) => kind.normalize(value),
            None => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn percent_is_clamped_integer_string() {
        let kind = ValueKind::scalar(ScalarKind::Percent);
        assert_eq!(kind.normalize(&json!("15%")), json!("15"));
        assert_eq!(kind.normalize(&json!(140)), json!("100"));
        assert_eq!(kind.normalize(&json!(-3.2)), json!("0"));
        assert_eq!(kind.normalize(&json!("12.6")), json!("13"));
        assert_eq!(kind.normalize(&json!("nan-ish")), json!("nan-ish"));
    }

    #[test]
    fn bools_become_one_and_zero() {
        let list = ValueKind::list(ScalarKind::Bool);
        assert_eq!(
            list.normalize(&json!([true, "0", 1, "false"])),
            json!(["1", "0", "1", "0"])
        );
        assert_eq!(
            ValueKind::scalar(ScalarKind::Bool).normalize(&json!("maybe")),
            json!("maybe")
        );
    }

    #[test]
    fn float_or_percent_keeps_representation() {
        let kind = ValueKind::scalar(ScalarKind::FloatOrPercent);
        assert_eq!(kind.normalize(&json!("50%")), json!("50%"));
        assert_eq!(
            FloatOrPercent::parse(&json!("50%")),
            Some(FloatOrPercent {
                value: 50.0,
                percent: true
            })
        );
        assert_eq!(
            FloatOrPercent::parse(&json!("0.45")),
            Some(FloatOrPercent {
                value: 0.45,
                percent: false
            })
        );
    }

    #[test]
    fn lists_are_never_merged_only_normalized() {
        let kind = ValueKind::list(ScalarKind::Float);
        assert_eq!(kind.normalize(&json!(["0.4", "0.6"])), json!(["0.4", "0.6"]));
    }

    #[test]
    fn loads_definitions_and_ignores_unknown_types() {
        let dictionary = KindDictionary::from_json(
            r#"{
                "nozzle_diameter": {"type": "coFloats", "tooltip": "Diameter of nozzle"},
                "infill_density": {"type": "coPercent"},
                "weird": {"type": "coSomethingElse"},
                "no_type": {}
            }"#,
        )
        .expect("definitions");
        assert_eq!(dictionary.len(), 4);
        assert_eq!(
            dictionary.kind("nozzle_diameter"),
            Some(ValueKind::list(ScalarKind::Float))
        );
        assert_eq!(dictionary.tooltip("nozzle_diameter"), Some("Diameter of nozzle"));
        assert_eq!(dictionary.kind("weird"), None);
        assert_eq!(dictionary.normalize("infill_density", &json!("20%")), json!("20"));
        assert_eq!(dictionary.normalize("unknown", &json!("20%")), json!("20%"));
    }
}
