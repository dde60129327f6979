mod csv;
mod flat_file;
mod platform;
mod workbook;

use crate::catalog::RawTable;
use crate::catalog::xlsx::WorkbookError;
use crate::localize::LocalizationResultItem;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub use platform::slugify;

pub const CSV_MIME: &str = "text/csv; charset=utf-8";
pub const TSV_MIME: &str = "text/tab-separated-values; charset=utf-8";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Target file shape. Each variant carries the context it cannot be built
/// without, so a flat file request lacking raw rows fails at decode time.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ExportFormat {
    GenericCsv,
    AmazonFlatFile { raw_table: RawTable },
    ShopifyCsv,
    EtsyCsv,
    Workbook { marketplace: String },
}

impl ExportFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::GenericCsv => "generic_csv",
            ExportFormat::AmazonFlatFile { .. } => "amazon_flat_file",
            ExportFormat::ShopifyCsv => "shopify_csv",
            ExportFormat::EtsyCsv => "etsy_csv",
            ExportFormat::Workbook { .. } => "workbook",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: &'static str,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("amazon flat file export requires the original raw rows")]
    MissingRawRows,
    #[error("original raw rows have no row {0}")]
    MissingSourceRow(usize),
    #[error("unknown marketplace: {0}")]
    UnknownMarketplace(String),
    #[error("csv write failed: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("csv buffer failed: {0}")]
    Buffer(String),
    #[error("workbook write failed: {0}")]
    Workbook(#[from] WorkbookError),
}

/// Serializes a finished result set into the requested format.
pub fn export(
    results: &[LocalizationResultItem],
    format: &ExportFormat,
) -> Result<ExportArtifact, ExportError> {
    let artifact = match format {
        ExportFormat::GenericCsv => csv::generic_csv(results)?,
        ExportFormat::AmazonFlatFile { raw_table } => flat_file::amazon_flat_file(results, raw_table)?,
        ExportFormat::ShopifyCsv => platform::shopify_csv(results)?,
        ExportFormat::EtsyCsv => platform::etsy_csv(results)?,
        ExportFormat::Workbook { marketplace } => workbook::workbook(results, marketplace)?,
    };

    info!(
        target = "hermes.export",
        format = format.name(),
        listings = results.len(),
        bytes = artifact.bytes.len(),
        "export_built"
    );
    Ok(artifact)
}
