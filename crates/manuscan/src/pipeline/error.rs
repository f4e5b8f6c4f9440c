use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::asset::Asset;
use crate::normalize::{ParseError, SchemaError};

/// Why a single asset produced no record. Never aborts the batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Analysis call failed: {0}")]
    Call(#[from] AnalysisError),

    #[error("Could not parse reply: {0}")]
    Parse(#[from] ParseError),

    #[error("Reply does not match the response schema: {source}")]
    Schema {
        #[source]
        source: SchemaError,
        raw: String,
    },

    #[error("Batch cancelled before this asset was analyzed")]
    Cancelled,

    #[error("Worker stopped before finishing this asset")]
    WorkerLost,
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Call(_) => FailureKind::Call,
            PipelineError::Parse(_) => FailureKind::Parse,
            PipelineError::Schema { .. } => FailureKind::Schema,
            PipelineError::Cancelled => FailureKind::Cancelled,
            PipelineError::WorkerLost => FailureKind::Worker,
        }
    }

    /// The model's reply, when there was one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PipelineError::Parse(e) => Some(e.raw()),
            PipelineError::Schema { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Call,
    Parse,
    Schema,
    Cancelled,
    Worker,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Call => "call",
            FailureKind::Parse => "parse",
            FailureKind::Schema => "schema",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Worker => "worker",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A skipped asset, kept for the report.
#[derive(Debug, Clone)]
pub struct AssetFailure {
    /// Position in the input list.
    pub index: usize,
    pub asset: Asset,
    pub kind: FailureKind,
    pub message: String,
    pub raw_response: Option<String>,
}

impl AssetFailure {
    pub fn from_error(index: usize, asset: Asset, error: &PipelineError) -> Self {
        Self {
            index,
            asset,
            kind: error.kind(),
            message: error.to_string(),
            raw_response: error.raw_response().map(str::to_string),
        }
    }
}
