//! The expected shape of a model reply.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Integer,
    String,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::String => write!(f, "string"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Expected values for string fields. Checked case-insensitively; compound
    /// values such as `left-right` match when every part is in the list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vec<String>>,
}

impl FieldSpec {
    pub fn boolean(name: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::Boolean,
            vocabulary: None,
        }
    }

    pub fn integer(name: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::Integer,
            vocabulary: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::String,
            vocabulary: None,
        }
    }

    pub fn with_vocabulary(mut self, words: &[&str]) -> Self {
        self.vocabulary = Some(words.iter().map(|w| w.to_string()).collect());
        self
    }

    fn accepts(&self, value: &str) -> bool {
        let Some(vocabulary) = &self.vocabulary else {
            return true;
        };
        let known = |word: &str| vocabulary.iter().any(|v| v.eq_ignore_ascii_case(word));

        let value = value.trim();
        if known(value) {
            return true;
        }

        let mut parts = value
            .split(|c: char| matches!(c, '-' | '/' | ',' | '+') || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .peekable();
        parts.peek().is_some() && parts.all(known)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("field '{field}' should be {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: &'static str,
    },

    #[error("field '{field}' is missing")]
    MissingField { field: String },
}

/// A value outside a field's vocabulary. Logged, never fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyWarning {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ResponseSchema {
    fields: Vec<FieldSpec>,
    require_all: bool,
}

impl ResponseSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            require_all: false,
        }
    }

    /// The fields requested by the built-in manuscript prompt.
    pub fn manuscript() -> Self {
        Self::new(vec![
            FieldSpec::boolean("Chinese character present"),
            FieldSpec::boolean("Chinese page number"),
            FieldSpec::boolean("Arabic numeral present"),
            FieldSpec::integer("Arabic numeral int"),
            FieldSpec::boolean("Illustration present"),
            FieldSpec::string("Illustration position")
                .with_vocabulary(&["none", "left", "right", "center"]),
            FieldSpec::boolean("Illustration caption"),
            FieldSpec::boolean("Tibetian page number"),
            FieldSpec::string("Frame present").with_vocabulary(&["None", "Red", "Black"]),
        ])
    }

    pub fn require_all_fields(mut self, require: bool) -> Self {
        self.require_all = require;
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<FieldSpec> {
        self.fields
    }

    /// Converts string-encoded booleans and integers of declared fields in place.
    pub fn coerce(&self, record: &mut Map<String, Value>) {
        for spec in &self.fields {
            let Some(value) = record.get_mut(&spec.name) else {
                continue;
            };
            if let Some(coerced) = coerce_value(spec.field_type, value) {
                *value = coerced;
            }
        }
    }

    /// Checks declared fields; undeclared keys pass through untouched.
    pub fn validate(
        &self,
        record: &Map<String, Value>,
    ) -> Result<Vec<VocabularyWarning>, SchemaError> {
        let mut warnings = Vec::new();

        for spec in &self.fields {
            let value = match record.get(&spec.name) {
                None if self.require_all => {
                    return Err(SchemaError::MissingField {
                        field: spec.name.clone(),
                    })
                }
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };

            let type_ok = match spec.field_type {
                FieldType::Boolean => value.is_boolean(),
                FieldType::Integer => value.is_i64() || value.is_u64(),
                FieldType::String => value.is_string(),
            };
            if !type_ok {
                return Err(SchemaError::TypeMismatch {
                    field: spec.name.clone(),
                    expected: spec.field_type,
                    found: json_type_name(value),
                });
            }

            if let Value::String(s) = value {
                if !spec.accepts(s) {
                    warnings.push(VocabularyWarning {
                        field: spec.name.clone(),
                        value: s.clone(),
                    });
                }
            }
        }

        Ok(warnings)
    }
}

impl Default for ResponseSchema {
    fn default() -> Self {
        Self::manuscript()
    }
}

fn coerce_value(field_type: FieldType, value: &Value) -> Option<Value> {
    match (field_type, value) {
        (FieldType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (FieldType::Integer, Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case("none")
                || trimmed.eq_ignore_ascii_case("null")
            {
                return Some(Value::Null);
            }
            trimmed.parse::<i64>().ok().map(Value::from)
        }
        (FieldType::Integer, Value::Number(n)) if !n.is_i64() && !n.is_u64() => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        _ => None,
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
