//! The table built from successfully parsed replies.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::asset::{Asset, PageNumber};

pub const COLUMN_DOCUMENT_ID: &str = "PPN";
pub const COLUMN_PAGE_NUMBER: &str = "Page number";
pub const COLUMN_IMAGE: &str = "Image";
pub const COLUMN_TIMESTAMP: &str = "Timestamp";

pub const METADATA_COLUMNS: [&str; 4] = [
    COLUMN_DOCUMENT_ID,
    COLUMN_PAGE_NUMBER,
    COLUMN_IMAGE,
    COLUMN_TIMESTAMP,
];

/// The decoded reply for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub asset: Asset,
    /// Reply fields in the order the model wrote them.
    pub fields: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl ParsedRecord {
    pub fn new(asset: Asset, fields: Map<String, Value>) -> Self {
        Self {
            asset,
            fields,
            timestamp: Utc::now(),
        }
    }

    /// Same asset and same fields; the timestamp is ignored.
    pub fn same_content(&self, other: &ParsedRecord) -> bool {
        self.asset == other.asset && self.fields == other.fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Cell {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Integer(i),
                None => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            },
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Plain-text rendering; booleans as `true`/`false`, empty as "".
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Bool(b) => b.to_string(),
            Cell::Integer(i) => i.to_string(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// Records in processing order, one per successfully analyzed asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    records: Vec<ParsedRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ParsedRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ParsedRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParsedRecord> {
        self.records.iter()
    }

    /// Metadata columns, then every reply key in first-seen order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = METADATA_COLUMNS.iter().map(|c| c.to_string()).collect();
        for record in &self.records {
            for key in record.fields.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    /// One row per record, aligned with [`ResultSet::columns`]. Keys a record
    /// lacks are [`Cell::Empty`].
    pub fn rows(&self) -> Vec<Vec<Cell>> {
        let columns = self.columns();
        self.records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| match column.as_str() {
                        COLUMN_DOCUMENT_ID => Cell::Text(record.asset.document_id.to_string()),
                        COLUMN_PAGE_NUMBER => page_cell(record.asset.page_number),
                        COLUMN_IMAGE => Cell::Text(image_link(&record.asset)),
                        COLUMN_TIMESTAMP => Cell::Text(
                            record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                        ),
                        key => record
                            .fields
                            .get(key)
                            .map(Cell::from_json)
                            .unwrap_or(Cell::Empty),
                    })
                    .collect()
            })
            .collect()
    }

    /// Record-by-record [`ParsedRecord::same_content`].
    pub fn same_content(&self, other: &ResultSet) -> bool {
        self.records.len() == other.records.len()
            && self
                .records
                .iter()
                .zip(&other.records)
                .all(|(a, b)| a.same_content(b))
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ParsedRecord;
    type IntoIter = std::slice::Iter<'a, ParsedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Integer when the page number is known and fits, otherwise its text form.
fn page_cell(page: PageNumber) -> Cell {
    page.as_number()
        .and_then(|n| i64::try_from(n).ok())
        .map(Cell::Integer)
        .unwrap_or_else(|| Cell::Text(page.to_string()))
}

/// Relative path with forward slashes, as used in report links.
pub fn image_link(asset: &Asset) -> String {
    asset
        .relative_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
