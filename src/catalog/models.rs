use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay, skip_serializing_none};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Number of bullet slots a listing can carry.
pub const BULLET_SLOTS: usize = 5;

/// One uploaded row keyed by original column name.
pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Tsv,
    Xlsx,
}

impl SourceFormat {
    pub fn delimiter(&self) -> Option<u8> {
        match self {
            SourceFormat::Csv => Some(b','),
            SourceFormat::Tsv => Some(b'\t'),
            SourceFormat::Xlsx => None,
        }
    }
}

/// Decoded upload: unique column names in file order plus one map per data
/// row keyed by those names.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Header text as written in the file, position-aligned with `headers`.
    /// Present only when ingestion had to rename a blank or repeated header.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_headers: Vec<String>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header text to write back for column `idx`.
    pub fn source_header(&self, idx: usize) -> Option<&str> {
        if self.source_headers.len() == self.headers.len() {
            self.source_headers.get(idx).map(String::as_str)
        } else {
            self.headers.get(idx).map(String::as_str)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedUpload {
    pub format: SourceFormat,
    #[serde(flatten)]
    pub table: RawTable,
}

/// Canonical field a source column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub enum TargetField {
    Title,
    Description,
    Keywords,
    Price,
    Category,
    BulletPoint(usize),
    DoNotTranslate,
    Ignore,
}

impl TargetField {
    /// Targets that copy the raw value into `extra_fields` instead of the record.
    pub fn is_passthrough(&self) -> bool {
        matches!(self, TargetField::DoNotTranslate | TargetField::Ignore)
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetField::Title => f.write_str("title"),
            TargetField::Description => f.write_str("description"),
            TargetField::Keywords => f.write_str("keywords"),
            TargetField::Price => f.write_str("price"),
            TargetField::Category => f.write_str("category"),
            TargetField::BulletPoint(slot) => write!(f, "bulletPoints.{slot}"),
            TargetField::DoNotTranslate => f.write_str("doNotTranslate"),
            TargetField::Ignore => f.write_str("ignore"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown target field `{0}`")]
pub struct UnknownTargetField(String);

impl FromStr for TargetField {
    type Err = UnknownTargetField;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let value = input.trim();
        let field = match value {
            "title" => TargetField::Title,
            "description" => TargetField::Description,
            "keywords" => TargetField::Keywords,
            "price" => TargetField::Price,
            "category" => TargetField::Category,
            "doNotTranslate" => TargetField::DoNotTranslate,
            "ignore" => TargetField::Ignore,
            other => {
                let slot = other
                    .strip_prefix("bulletPoints.")
                    .and_then(|raw| raw.parse::<usize>().ok())
                    .filter(|slot| *slot < BULLET_SLOTS)
                    .ok_or_else(|| UnknownTargetField(other.to_string()))?;
                TargetField::BulletPoint(slot)
            }
        };
        Ok(field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_field: TargetField,
}

impl ColumnMapping {
    pub fn new(source_column: impl Into<String>, target_field: TargetField) -> Self {
        Self {
            source_column: source_column.into(),
            target_field,
        }
    }
}

/// One row of canonical input, created once by the normalizer.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedListing {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Slot-aligned; an empty string asks the generator to write that bullet.
    #[serde(default)]
    pub bullet_points: Option<Vec<String>>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub source_row: usize,
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,
}

impl ParsedListing {
    pub fn bullet_count(&self) -> usize {
        self.bullet_points.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// Case-insensitive lookup over passthrough columns.
    pub fn extra_field(&self, names: &[&str]) -> Option<&str> {
        self.extra_fields
            .iter()
            .find(|(key, _)| names.iter().any(|name| key.eq_ignore_ascii_case(name)))
            .map(|(_, value)| value.as_str())
    }
}
