use crate::catalog::models::SourceFormat;
use crate::catalog::{ColumnMapping, RawRow, RawTable};
use crate::export::ExportFormat;
use crate::localize::{GenerationUsage, LocalizationResultItem, QualitySummary};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uploaded file carried inline in a JSON body.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadPayload {
    pub filename: String,
    pub content_base64: String,
}

impl UploadPayload {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.content_base64.trim())
    }
}

/// Either a raw file to ingest or rows the caller already parsed.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceInput {
    Upload(UploadPayload),
    Rows(RawTable),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalizationRequest {
    pub source: SourceInput,
    /// Omitted means auto-detect from the headers.
    #[serde(default)]
    pub mappings: Option<Vec<ColumnMapping>>,
    pub marketplace: String,
    pub target_language: String,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocalizationResponse {
    pub job_id: String,
    pub marketplace: String,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub mappings: Vec<ColumnMapping>,
    pub results: Vec<LocalizationResultItem>,
    /// The decoded upload, indexed by each result's `source_row`. Sent back
    /// as `raw_table` on an `amazon_flat_file` export.
    #[serde(default)]
    pub raw_table: RawTable,
    pub quality: QualitySummary,
    pub usage: GenerationUsage,
    pub stages: Vec<StageReport>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StageReport {
    pub name: String,
    pub elapsed_ms: u128,
    pub timestamp: DateTime<Utc>,
    pub output: Value,
}

impl StageReport {
    pub fn new(name: &str, elapsed_ms: u128, output: Value) -> Self {
        Self {
            name: name.to_string(),
            elapsed_ms,
            timestamp: Utc::now(),
            output,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InspectResponse {
    pub format: SourceFormat,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub preview: Vec<RawRow>,
    pub suggested_mappings: Vec<ColumnMapping>,
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_mappings: Option<Vec<ColumnMapping>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingDocument {
    #[serde(default)]
    pub fingerprint: String,
    pub mappings: Vec<ColumnMapping>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub results: Vec<LocalizationResultItem>,
    pub format: ExportFormat,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: Some(detail.into()),
        }
    }
}
