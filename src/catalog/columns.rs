use crate::catalog::models::{BULLET_SLOTS, ColumnMapping, TargetField};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Title,
    Description,
    BulletPoint,
    Keywords,
    Price,
    Category,
}

impl Family {
    fn scalar_target(self) -> Option<TargetField> {
        match self {
            Family::Title => Some(TargetField::Title),
            Family::Description => Some(TargetField::Description),
            Family::Keywords => Some(TargetField::Keywords),
            Family::Price => Some(TargetField::Price),
            Family::Category => Some(TargetField::Category),
            Family::BulletPoint => None,
        }
    }
}

/// Checked in this order; the first family with a matching pattern wins.
const FAMILIES: &[(Family, &[&str])] = &[
    (
        Family::Title,
        &[
            "title",
            "item_name",
            "product_name",
            "product_title",
            "titel",
            "titre",
            "titolo",
            "titulo",
        ],
    ),
    (
        Family::Description,
        &[
            "description",
            "product_description",
            "long_description",
            "body",
            "body_html",
            "desc",
            "beschreibung",
        ],
    ),
    (
        Family::BulletPoint,
        &[
            "bullet_point",
            "bulletpoint",
            "bullet",
            "feature",
            "key_feature",
            "highlight",
        ],
    ),
    (
        Family::Keywords,
        &[
            "keywords",
            "keyword",
            "generic_keyword",
            "generic_keywords",
            "search_terms",
            "tags",
        ],
    ),
    (
        Family::Price,
        &["price", "standard_price", "list_price", "variant_price", "preis", "prix"],
    ),
    (
        Family::Category,
        &[
            "category",
            "product_type",
            "item_type",
            "product_category",
            "kategorie",
            "categorie",
        ],
    ),
];

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-]+").expect("separator regex"));

/// Numbered variants ("bullet_1", "bullet1", "bulletpoint3") for every pattern.
static NUMBERED: Lazy<Vec<(Family, Regex)>> = Lazy::new(|| {
    FAMILIES
        .iter()
        .flat_map(|(family, patterns)| {
            patterns
                .iter()
                .filter(|pattern| !pattern.ends_with(|ch: char| ch.is_ascii_digit()))
                .map(move |pattern| {
                    let regex = Regex::new(&format!("^{}_?\\d+$", regex::escape(pattern)))
                        .expect("numbered column regex");
                    (*family, regex)
                })
        })
        .collect()
});

/// Lowercase, trim, and collapse whitespace/hyphen runs into one underscore.
pub fn normalize_header(header: &str) -> String {
    SEPARATORS
        .replace_all(header.trim(), "_")
        .to_lowercase()
}

fn pattern_matches(normalized: &str, pattern: &str) -> bool {
    normalized == pattern
        || normalized.starts_with(&format!("{pattern}_"))
        || normalized.ends_with(&format!("_{pattern}"))
}

fn detect_family(normalized: &str) -> Option<Family> {
    FAMILIES.iter().find_map(|(family, patterns)| {
        let direct = patterns
            .iter()
            .any(|pattern| pattern_matches(normalized, pattern));
        let numbered = NUMBERED
            .iter()
            .any(|(candidate, regex)| candidate == family && regex.is_match(normalized));
        (direct || numbered).then_some(*family)
    })
}

/// Suggests a target field for every header, in header order.
///
/// Bullet columns take slots 0..=4 in encounter order; a sixth or later
/// bullet column also lands on slot 4. Two headers matching the same scalar
/// family both get that target, so [`validate_mappings`] reports the
/// duplicate instead of one column being dropped silently.
pub fn auto_detect_columns(headers: &[String]) -> Vec<ColumnMapping> {
    let mut next_bullet = 0usize;

    headers
        .iter()
        .map(|header| {
            let target = match detect_family(&normalize_header(header)) {
                Some(Family::BulletPoint) => {
                    let slot = next_bullet.min(BULLET_SLOTS - 1);
                    next_bullet += 1;
                    TargetField::BulletPoint(slot)
                }
                Some(family) => family.scalar_target().unwrap_or(TargetField::Ignore),
                None => TargetField::Ignore,
            };
            ColumnMapping::new(header.clone(), target)
        })
        .collect()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("no column is mapped to `title`")]
    MissingTitle,
    #[error("`{target}` is mapped from both `{first}` and `{second}`")]
    DuplicateTarget {
        target: TargetField,
        first: String,
        second: String,
    },
    #[error("mapped column `{0}` is not present in the upload")]
    UnknownColumn(String),
}

/// A mapping set is usable when a title column exists and no scalar target
/// is fed by two columns. Repeated bullet slots are allowed (last one wins).
pub fn validate_mappings(mappings: &[ColumnMapping]) -> Result<(), MappingError> {
    let mut seen: Vec<(TargetField, &str)> = Vec::new();
    for mapping in mappings {
        let target = mapping.target_field;
        if target.is_passthrough() || matches!(target, TargetField::BulletPoint(_)) {
            continue;
        }
        if let Some((_, first)) = seen.iter().find(|(existing, _)| *existing == target) {
            return Err(MappingError::DuplicateTarget {
                target,
                first: first.to_string(),
                second: mapping.source_column.clone(),
            });
        }
        seen.push((target, mapping.source_column.as_str()));
    }
    if !seen.iter().any(|(target, _)| *target == TargetField::Title) {
        return Err(MappingError::MissingTitle);
    }
    Ok(())
}

/// Like [`validate_mappings`], and every mapped column must exist in `headers`.
pub fn validate_against_headers(
    mappings: &[ColumnMapping],
    headers: &[String],
) -> Result<(), MappingError> {
    if let Some(unknown) = mappings
        .iter()
        .find(|mapping| !headers.iter().any(|header| *header == mapping.source_column))
    {
        return Err(MappingError::UnknownColumn(unknown.source_column.clone()));
    }
    validate_mappings(mappings)
}

/// Order-independent key for "a file with these columns".
pub fn header_fingerprint(headers: &[String]) -> String {
    let mut normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    normalized.sort();
    let digest = Sha256::digest(normalized.join("|").as_bytes());
    format!("{digest:x}")
}
