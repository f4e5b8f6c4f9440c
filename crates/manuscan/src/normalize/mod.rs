//! Turning a raw model reply into a typed record.

pub mod extract;
pub mod schema;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use schema::{
    json_type_name, FieldSpec, FieldType, ResponseSchema, SchemaError, VocabularyWarning,
};

/// How the JSON object is located in the reply text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// First balanced `{...}` span, wherever it sits in the text.
    #[default]
    BalancedObject,
    /// Drop the first and last line and parse the rest. Fails on unwrapped
    /// single-line replies.
    LineTrim,
}

impl std::str::FromStr for ExtractionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balanced_object" | "balanced-object" => Ok(Self::BalancedObject),
            "line_trim" | "line-trim" => Ok(Self::LineTrim),
            other => Err(format!(
                "unknown extraction strategy '{}' (expected balanced_object or line_trim)",
                other
            )),
        }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("response contains no JSON object")]
    NoObject { raw: String },

    #[error("response JSON is {found}, not an object")]
    NotAnObject { found: &'static str, raw: String },

    #[error("invalid JSON in response: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
}

impl ParseError {
    /// The unmodified reply, kept for diagnosis.
    pub fn raw(&self) -> &str {
        match self {
            ParseError::NoObject { raw }
            | ParseError::NotAnObject { raw, .. }
            | ParseError::InvalidJson { raw, .. } => raw,
        }
    }
}

/// Extracts and parses the JSON object embedded in `raw`.
pub fn parse_response(
    raw: &str,
    strategy: ExtractionStrategy,
) -> Result<Map<String, Value>, ParseError> {
    let candidate = match strategy {
        ExtractionStrategy::BalancedObject => extract::balanced_object(raw)
            .ok_or_else(|| ParseError::NoObject {
                raw: raw.to_string(),
            })?
            .to_string(),
        ExtractionStrategy::LineTrim => extract::strip_wrapper_lines(raw),
    };

    let value: Value =
        serde_json::from_str(&candidate).map_err(|source| ParseError::InvalidJson {
            source,
            raw: raw.to_string(),
        })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ParseError::NotAnObject {
            found: json_type_name(&other),
            raw: raw.to_string(),
        }),
    }
}
