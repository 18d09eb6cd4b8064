//! Parameter schemas
//!
//! Single source of truth for what a rule accepts: parameter names, types,
//! ranges, and which keys are required. The resolver validates raw
//! configuration args here first so errors name the rule and the field,
//! then hands the args to the rule's typed deserializer.

use crate::error::{ConfigError, ConfigResult};
use serde::Serialize;
use serde_json::{Map, Value};

/// Expected type and range of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamType {
    /// Finite number within `[min, max]` (or `(min, max]` when `min_exclusive`)
    Number { min: f64, max: f64, min_exclusive: bool },
    /// Integer within `[min, max]`
    Integer { min: i64, max: i64 },
    Bool,
    /// Non-empty list of non-empty strings
    NameList,
}

impl ParamType {
    /// Number > 0
    pub const fn positive() -> Self {
        ParamType::Number {
            min: 0.0,
            max: f64::INFINITY,
            min_exclusive: true,
        }
    }

    /// Number >= 0
    pub const fn non_negative() -> Self {
        ParamType::Number {
            min: 0.0,
            max: f64::INFINITY,
            min_exclusive: false,
        }
    }

    /// Number in `[min, max]`
    pub const fn range(min: f64, max: f64) -> Self {
        ParamType::Number {
            min,
            max,
            min_exclusive: false,
        }
    }

    /// Integer >= `min`
    pub const fn at_least(min: i64) -> Self {
        ParamType::Integer { min, max: i64::MAX }
    }

    /// Short type name for listings
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamType::Number { .. } => "number",
            ParamType::Integer { .. } => "integer",
            ParamType::Bool => "bool",
            ParamType::NameList => "list<string>",
        }
    }

    /// Human-readable validation range
    pub fn range_text(&self) -> String {
        match *self {
            ParamType::Number {
                min,
                max,
                min_exclusive,
            } => {
                let op = if min_exclusive { ">" } else { ">=" };
                if max.is_infinite() {
                    format!("{} {}", op, min)
                } else {
                    format!("[{}, {}]", min, max)
                }
            }
            ParamType::Integer { min, max } => {
                if max == i64::MAX {
                    format!(">= {}", min)
                } else {
                    format!("[{}, {}]", min, max)
                }
            }
            ParamType::Bool => "true | false".to_string(),
            ParamType::NameList => "non-empty".to_string(),
        }
    }

    /// Check a value, returning the reason it is rejected
    fn check(&self, value: &Value) -> Result<(), String> {
        match *self {
            ParamType::Number {
                min,
                max,
                min_exclusive,
            } => {
                let v = value
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| format!("must be a number, got {}", value))?;
                let below = if min_exclusive { v <= min } else { v < min };
                if below || v > max {
                    return Err(format!("value {} out of range {}", v, self.range_text()));
                }
                Ok(())
            }
            ParamType::Integer { min, max } => {
                let v = value
                    .as_i64()
                    .ok_or_else(|| format!("must be an integer, got {}", value))?;
                if v < min || v > max {
                    return Err(format!("value {} out of range {}", v, self.range_text()));
                }
                Ok(())
            }
            ParamType::Bool => value
                .as_bool()
                .map(|_| ())
                .ok_or_else(|| format!("must be true or false, got {}", value)),
            ParamType::NameList => {
                let items = value
                    .as_array()
                    .ok_or_else(|| format!("must be a list of strings, got {}", value))?;
                if items.is_empty() {
                    return Err("must not be empty".to_string());
                }
                for item in items {
                    match item.as_str() {
                        Some(s) if !s.trim().is_empty() => {}
                        _ => return Err(format!("contains invalid name {}", item)),
                    }
                }
                Ok(())
            }
        }
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub ty: ParamType,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(key: &'static str, ty: ParamType, description: &'static str) -> Self {
        Self {
            key,
            ty,
            required: true,
            description,
        }
    }

    pub const fn optional(key: &'static str, ty: ParamType, description: &'static str) -> Self {
        Self {
            key,
            ty,
            required: false,
            description,
        }
    }
}

/// Parameter schema of one rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSchema {
    pub params: Vec<ParamSpec>,
    /// Pairs `(lower, upper)` that must satisfy `lower <= upper` when both are set
    pub ordered: Vec<(&'static str, &'static str)>,
}

impl ParamSchema {
    /// Schema accepting no parameters
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self {
            params,
            ordered: Vec::new(),
        }
    }

    /// Require `lower <= upper`
    pub fn with_ordered(mut self, lower: &'static str, upper: &'static str) -> Self {
        self.ordered.push((lower, upper));
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.key == key)
    }

    /// Validate one parameter set
    ///
    /// `null` is treated as an empty mapping. Checks run in a fixed order:
    /// unknown keys, missing required keys, per-value type/range, then
    /// cross-field ordering; the first violation is reported.
    pub fn validate(&self, rule: &str, args: &Value) -> ConfigResult<()> {
        let empty = Map::new();
        let map = match args {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(ConfigError::MalformedEntry {
                    rule: rule.to_string(),
                    reason: format!("args must be a mapping, got {}", other),
                })
            }
        };

        let violation = |field: &str, reason: String| ConfigError::SchemaViolation {
            rule: rule.to_string(),
            field: field.to_string(),
            reason,
        };

        for key in map.keys() {
            if self.get(key).is_none() {
                return Err(violation(key.as_str(), "is not a recognised parameter".to_string()));
            }
        }

        for spec in &self.params {
            match map.get(spec.key) {
                None if spec.required => {
                    return Err(violation(spec.key, "is required".to_string()));
                }
                None => {}
                Some(value) => spec.ty.check(value).map_err(|r| violation(spec.key, r))?,
            }
        }

        for (lower, upper) in &self.ordered {
            let lo = map.get(*lower).and_then(Value::as_f64);
            let hi = map.get(*upper).and_then(Value::as_f64);
            if let (Some(lo), Some(hi)) = (lo, hi) {
                if lo > hi {
                    return Err(violation(
                        *upper,
                        format!("must be >= {} ({} > {})", lower, lo, hi),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Serializable description for listings
    pub fn describe(&self) -> Vec<ParamInfo> {
        self.params
            .iter()
            .map(|p| ParamInfo {
                key: p.key,
                type_name: p.ty.type_name(),
                range: p.ty.range_text(),
                required: p.required,
                description: p.description,
            })
            .collect()
    }
}

/// Parameter description as shown by `list-rules`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamInfo {
    pub key: &'static str,
    #[serde(rename = "type")]
    pub type_name: &'static str,
    pub range: String,
    pub required: bool,
    pub description: &'static str,
}
