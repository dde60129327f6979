use super::{CSV_MIME, ExportArtifact, ExportError};
use crate::localize::LocalizationResultItem;
use crate::localize::quality::summarize_flags;
use ::csv::{QuoteStyle, Terminator, WriterBuilder};

/// Writes a header plus rows; values containing the delimiter, a quote or a
/// newline are quoted with interior quotes doubled.
pub(super) fn write_table(
    delimiter: u8,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .flexible(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| ExportError::Buffer(err.to_string()))
}

/// Column titles shared by the generic CSV and the workbook main sheet.
pub(super) fn comparison_headers(bullet_pairs: usize) -> Vec<String> {
    let mut headers = vec![
        "Row".to_string(),
        "Original Title".to_string(),
        "Localized Title".to_string(),
        "Original Description".to_string(),
        "Localized Description".to_string(),
    ];
    for slot in 1..=bullet_pairs {
        headers.push(format!("Original Bullet {slot}"));
        headers.push(format!("Localized Bullet {slot}"));
    }
    headers.extend(
        [
            "Original Keywords",
            "Localized Keywords",
            "SEO Meta Title",
            "SEO Meta Description",
            "Quality Flags",
        ]
        .map(String::from),
    );
    headers
}

pub(super) fn comparison_row(item: &LocalizationResultItem, bullet_pairs: usize) -> Vec<String> {
    let original = &item.original;
    let localized = &item.localized;
    let original_bullets = original.bullet_points.as_deref().unwrap_or(&[]);
    let localized_bullets = localized.bullet_points.as_deref().unwrap_or(&[]);

    let mut row = vec![
        (item.source_row + 1).to_string(),
        original.title.clone(),
        localized.title.clone(),
        original.description.clone(),
        localized.description.clone(),
    ];
    for slot in 0..bullet_pairs {
        row.push(original_bullets.get(slot).cloned().unwrap_or_default());
        row.push(localized_bullets.get(slot).cloned().unwrap_or_default());
    }
    row.push(original.keywords.clone().unwrap_or_default());
    row.push(localized.keywords.clone().unwrap_or_default());
    row.push(localized.seo_meta_title.clone().unwrap_or_default());
    row.push(localized.seo_meta_description.clone().unwrap_or_default());
    row.push(summarize_flags(&item.quality_flags));
    row
}

/// Bullet pair width is the largest bullet count seen on either side of any
/// result, so partially filled data keeps every value.
pub(super) fn generic_csv(results: &[LocalizationResultItem]) -> Result<ExportArtifact, ExportError> {
    let width = results
        .iter()
        .map(|item| item.original.bullet_count().max(item.localized.bullet_count()))
        .max()
        .unwrap_or(0);

    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|item| comparison_row(item, width))
        .collect();

    Ok(ExportArtifact {
        bytes: write_table(b',', &comparison_headers(width), &rows)?,
        filename: "localized_listings.csv".to_string(),
        mime: CSV_MIME,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ingest::parse_delimited;
    use crate::catalog::models::SourceFormat;
    use crate::export::fixtures;

    #[test]
    fn escapes_commas_and_quotes() {
        let bytes = write_table(
            b',',
            &["Title".to_string()],
            &[vec!["Widget, \"Pro\"".to_string()], vec!["plain".to_string()]],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Title\n\"Widget, \"\"Pro\"\"\"\nplain\n"
        );
    }

    #[test]
    fn newlines_are_quoted() {
        let bytes = write_table(b',', &["D".to_string()], &[vec!["line one\nline two".to_string()]])
            .unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "D\n\"line one\nline two\"\n");
    }

    #[test]
    fn bullet_width_follows_largest_result() {
        let mut narrow = fixtures::item(0, "Lamp", "Lampe");
        narrow.localized.bullet_points = None;
        narrow.original.bullet_points = None;
        let wide = fixtures::flagged(fixtures::item(1, "Mug", "Tasse"));
        let artifact = generic_csv(&[narrow, wide]).unwrap();
        let text = String::from_utf8(artifact.bytes).unwrap();
        let table = parse_delimited(&text, SourceFormat::Csv).unwrap();

        assert!(table.headers.contains(&"Localized Bullet 3".to_string()));
        assert!(!table.headers.contains(&"Localized Bullet 4".to_string()));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["Localized Bullet 1"], "");
        assert_eq!(table.rows[0]["Quality Flags"], "OK");
        assert_eq!(table.rows[1]["Row"], "2");
        assert_eq!(table.rows[1]["Localized Bullet 3"], "Dimmbar");
        assert_eq!(table.rows[1]["Original Bullet 3"], "");
        assert_eq!(table.rows[1]["Quality Flags"], "title: 210 chars (max 200)");
    }

    #[test]
    fn empty_result_set_still_has_header() {
        let artifact = generic_csv(&[]).unwrap();
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.starts_with("Row,Original Title,Localized Title"));
        assert_eq!(text.lines().count(), 1);
    }
}
