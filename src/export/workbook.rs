use super::csv::{comparison_headers, comparison_row};
use super::{ExportArtifact, ExportError, XLSX_MIME};
use crate::catalog::xlsx::{Sheet, SheetColumn, write_workbook};
use crate::localize::LocalizationResultItem;
use crate::marketplace;

const MAIN_SHEET: &str = "Localized Listings";
const REPORT_SHEET: &str = "Quality Report";

/// Main comparison sheet sized to the marketplace's bullet slots, plus a
/// per-flag report sheet when anything was flagged.
pub(super) fn workbook(
    results: &[LocalizationResultItem],
    marketplace_id: &str,
) -> Result<ExportArtifact, ExportError> {
    let profile = marketplace::lookup(marketplace_id)
        .ok_or_else(|| ExportError::UnknownMarketplace(marketplace_id.to_string()))?;
    let bullet_pairs = profile.bullet_point_count;

    let columns = comparison_headers(bullet_pairs)
        .into_iter()
        .map(|header| {
            let width = column_width(&header);
            SheetColumn::new(header, width)
        })
        .collect();
    let rows = results
        .iter()
        .map(|item| comparison_row(item, bullet_pairs))
        .collect();

    let mut sheets = vec![Sheet {
        name: MAIN_SHEET.to_string(),
        columns,
        rows,
    }];

    let report_rows: Vec<Vec<String>> = results
        .iter()
        .flat_map(|item| {
            item.quality_flags.iter().map(move |flag| {
                vec![
                    (item.source_row + 1).to_string(),
                    flag.field.clone(),
                    flag.issue.as_str().to_string(),
                    flag.detail.clone(),
                ]
            })
        })
        .collect();
    if !report_rows.is_empty() {
        sheets.push(Sheet {
            name: REPORT_SHEET.to_string(),
            columns: vec![
                SheetColumn::new("Row", 8.0),
                SheetColumn::new("Field", 22.0),
                SheetColumn::new("Issue", 20.0),
                SheetColumn::new("Detail", 50.0),
            ],
            rows: report_rows,
        });
    }

    Ok(ExportArtifact {
        bytes: write_workbook(&sheets)?,
        filename: format!("localized_listings_{}.xlsx", profile.id),
        mime: XLSX_MIME,
    })
}

fn column_width(header: &str) -> f32 {
    if header == "Row" {
        8.0
    } else if header.contains("Description") || header == "Quality Flags" {
        60.0
    } else {
        30.0
    }
}
