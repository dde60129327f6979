use super::csv::write_table;
use super::{CSV_MIME, ExportArtifact, ExportError};
use crate::localize::LocalizationResultItem;
use once_cell::sync::Lazy;
use regex::Regex;

const SLUG_MAX_CHARS: usize = 100;

static NON_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s_-]").expect("slug strip regex"));
static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_-]+").expect("slug separator regex"));

const SHOPIFY_COLUMNS: &[&str] = &[
    "Handle",
    "Title",
    "Body (HTML)",
    "Vendor",
    "Type",
    "Tags",
    "Published",
    "Variant SKU",
    "Variant Price",
    "SEO Title",
    "SEO Description",
];

const ETSY_COLUMNS: &[&str] = &[
    "TITLE",
    "DESCRIPTION",
    "PRICE",
    "QUANTITY",
    "TAGS",
    "MATERIALS",
    "SKU",
];

/// URL handle from a title: lowercase ASCII letters and digits joined by
/// single hyphens. German umlauts and `ß` are spelled out; any other
/// non-ASCII character is dropped, so a title in a non-Latin script can
/// come back empty.
pub fn slugify(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .flat_map(|ch| match ch {
            'ä' => vec!['a', 'e'],
            'ö' => vec!['o', 'e'],
            'ü' => vec!['u', 'e'],
            'ß' => vec!['s', 's'],
            _ => vec![ch],
        })
        .collect();
    let stripped = NON_SLUG.replace_all(&lowered, "");
    let hyphenated = SLUG_SEPARATORS.replace_all(&stripped, "-");
    let capped: String = hyphenated
        .trim_matches('-')
        .chars()
        .take(SLUG_MAX_CHARS)
        .collect();
    capped.trim_end_matches('-').to_string()
}

fn handle_for(item: &LocalizationResultItem) -> String {
    [item.localized.title.as_str(), item.original.title.as_str()]
        .into_iter()
        .map(slugify)
        .find(|slug| !slug.is_empty())
        .unwrap_or_else(|| format!("listing-{}", item.source_row + 1))
}

/// Falls back to the source text when generation left a field empty.
fn localized_or_original(localized: &str, original: &str) -> String {
    if localized.trim().is_empty() {
        original.to_string()
    } else {
        localized.to_string()
    }
}

pub(super) fn shopify_csv(results: &[LocalizationResultItem]) -> Result<ExportArtifact, ExportError> {
    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|item| {
            let original = &item.original;
            let localized = &item.localized;
            vec![
                handle_for(item),
                localized_or_original(&localized.title, &original.title),
                localized_or_original(&localized.description, &original.description),
                original
                    .extra_field(&["vendor", "brand", "brand_name"])
                    .unwrap_or_default()
                    .to_string(),
                original.category.clone().unwrap_or_default(),
                localized.keywords.clone().unwrap_or_default(),
                "TRUE".to_string(),
                original
                    .extra_field(&["sku", "variant_sku", "item_sku"])
                    .unwrap_or_default()
                    .to_string(),
                original.price.clone().unwrap_or_default(),
                localized.seo_meta_title.clone().unwrap_or_default(),
                localized.seo_meta_description.clone().unwrap_or_default(),
            ]
        })
        .collect();

    Ok(ExportArtifact {
        bytes: write_table(b',', &headers(SHOPIFY_COLUMNS), &rows)?,
        filename: "shopify_products.csv".to_string(),
        mime: CSV_MIME,
    })
}

pub(super) fn etsy_csv(results: &[LocalizationResultItem]) -> Result<ExportArtifact, ExportError> {
    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|item| {
            let original = &item.original;
            let localized = &item.localized;
            vec![
                localized_or_original(&localized.title, &original.title),
                localized_or_original(&localized.description, &original.description),
                original.price.clone().unwrap_or_default(),
                original
                    .extra_field(&["quantity", "qty", "stock"])
                    .unwrap_or("1")
                    .to_string(),
                localized.keywords.clone().unwrap_or_default(),
                original
                    .extra_field(&["materials", "material"])
                    .unwrap_or_default()
                    .to_string(),
                original
                    .extra_field(&["sku"])
                    .unwrap_or_default()
                    .to_string(),
            ]
        })
        .collect();

    Ok(ExportArtifact {
        bytes: write_table(b',', &headers(ETSY_COLUMNS), &rows)?,
        filename: "etsy_listings.csv".to_string(),
        mime: CSV_MIME,
    })
}

fn headers(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|column| column.to_string()).collect()
}
