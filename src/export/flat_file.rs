use super::csv::write_table;
use super::{ExportArtifact, ExportError, TSV_MIME};
use crate::catalog::RawTable;
use crate::catalog::models::BULLET_SLOTS;
use crate::localize::LocalizationResultItem;

const TITLE_COLUMN: &str = "item_name";
const DESCRIPTION_COLUMN: &str = "product_description";
const KEYWORD_COLUMN: &str = "generic_keyword";

/// Rebuilds the uploaded flat file with translated columns swapped in.
///
/// Every column of the original row survives untouched except `item_name`,
/// `product_description`, `bullet_point1..5` and `generic_keyword`. Those are
/// overwritten only when the localized value is non-empty, and appended to
/// the header when the upload lacked them.
pub(super) fn amazon_flat_file(
    results: &[LocalizationResultItem],
    raw_table: &RawTable,
) -> Result<ExportArtifact, ExportError> {
    if raw_table.rows.is_empty() {
        return Err(ExportError::MissingRawRows);
    }

    let mut headers = raw_table.headers.clone();
    let title = resolve_column(&mut headers, TITLE_COLUMN);
    let description = resolve_column(&mut headers, DESCRIPTION_COLUMN);
    let bullets: Vec<String> = (1..=BULLET_SLOTS)
        .map(|slot| resolve_column(&mut headers, &format!("bullet_point{slot}")))
        .collect();
    let keywords = resolve_column(&mut headers, KEYWORD_COLUMN);

    let mut rows = Vec::with_capacity(results.len());
    for item in results {
        let mut row = raw_table
            .rows
            .get(item.source_row)
            .cloned()
            .ok_or(ExportError::MissingSourceRow(item.source_row))?;
        let localized = &item.localized;

        overwrite(&mut row, &title, Some(&localized.title));
        overwrite(&mut row, &description, Some(&localized.description));
        if let Some(localized_bullets) = &localized.bullet_points {
            for (column, bullet) in bullets.iter().zip(localized_bullets) {
                overwrite(&mut row, column, Some(bullet));
            }
        }
        overwrite(&mut row, &keywords, localized.keywords.as_ref());

        rows.push(
            headers
                .iter()
                .map(|header| row.get(header).cloned().unwrap_or_default())
                .collect(),
        );
    }

    let written_headers: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            raw_table
                .source_header(idx)
                .unwrap_or(header.as_str())
                .to_string()
        })
        .collect();

    Ok(ExportArtifact {
        bytes: write_table(b'\t', &written_headers, &rows)?,
        filename: "amazon_flat_file.txt".to_string(),
        mime: TSV_MIME,
    })
}

/// Existing header spelling for `canonical`, appending it when absent.
fn resolve_column(headers: &mut Vec<String>, canonical: &str) -> String {
    if let Some(existing) = headers
        .iter()
        .find(|header| header.trim().eq_ignore_ascii_case(canonical))
    {
        return existing.clone();
    }
    headers.push(canonical.to_string());
    canonical.to_string()
}

fn overwrite(row: &mut crate::catalog::RawRow, column: &str, value: Option<&String>) {
    if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
        row.insert(column.to_string(), value.clone());
    }
}
