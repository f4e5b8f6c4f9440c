use serde_json::{Map, Value};

use crate::asset::Asset;
use crate::normalize::VocabularyWarning;

/// Working state for one asset as it moves through the steps.
pub struct AssetContext {
    // Input
    pub index: usize,
    pub asset: Asset,

    // analyze result
    pub raw_response: Option<String>,

    // normalize result, coerced and validated in place
    pub fields: Option<Map<String, Value>>,

    // Non-fatal findings from validation
    pub warnings: Vec<VocabularyWarning>,
}

impl AssetContext {
    pub fn new(index: usize, asset: Asset) -> Self {
        Self {
            index,
            asset,
            raw_response: None,
            fields: None,
            warnings: Vec::new(),
        }
    }
}
