use crate::catalog::models::{BULLET_SLOTS, ColumnMapping, ParsedListing, RawRow, TargetField};

/// Applies a confirmed mapping set to every raw row.
///
/// Mappings are applied in the order given, so when two columns feed the
/// same bullet slot the later one wins. Passthrough targets keep non-empty
/// raw values in `extra_fields` for re-export.
pub fn apply(rows: &[RawRow], mappings: &[ColumnMapping]) -> Vec<ParsedListing> {
    rows.iter()
        .enumerate()
        .map(|(source_row, row)| listing_from_row(source_row, row, mappings))
        .collect()
}

fn listing_from_row(source_row: usize, row: &RawRow, mappings: &[ColumnMapping]) -> ParsedListing {
    let mut listing = ParsedListing {
        source_row,
        ..ParsedListing::default()
    };
    let mut bullets: Option<[String; BULLET_SLOTS]> = None;

    for mapping in mappings {
        let value = row
            .get(&mapping.source_column)
            .map(|value| value.trim())
            .unwrap_or("");
        match mapping.target_field {
            TargetField::Title => listing.title = value.to_string(),
            TargetField::Description => listing.description = value.to_string(),
            TargetField::Keywords => listing.keywords = non_empty(value),
            TargetField::Price => listing.price = non_empty(value),
            TargetField::Category => listing.category = non_empty(value),
            TargetField::BulletPoint(slot) => {
                let slots = bullets.get_or_insert_with(Default::default);
                if let Some(cell) = slots.get_mut(slot) {
                    *cell = value.to_string();
                }
            }
            TargetField::DoNotTranslate | TargetField::Ignore => {
                if !value.is_empty() {
                    listing
                        .extra_fields
                        .insert(mapping.source_column.clone(), value.to_string());
                }
            }
        }
    }

    listing.bullet_points = bullets.map(Vec::from);
    listing
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
