use crate::catalog::ParsedListing;
use crate::localize::models::{LocalizationResultItem, LocalizedListing, QualityFlag, QualityIssue};
use crate::marketplace::{MarketplaceProfile, Platform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Originals at or below this length never trigger the short-output check.
const SHORT_CHECK_MIN_ORIGINAL: usize = 20;
const SHORT_RATIO: f64 = 0.10;

const SHOPIFY_SEO_TITLE_MAX: usize = 60;
const SHOPIFY_SEO_DESCRIPTION_MAX: usize = 160;

/// Validates one localized listing. Read-only: flags describe problems,
/// nothing is corrected.
pub fn check(
    localized: &LocalizedListing,
    marketplace: &MarketplaceProfile,
    original: &ParsedListing,
) -> Vec<QualityFlag> {
    let mut flags = Vec::new();

    check_field(
        &mut flags,
        "title",
        &localized.title,
        marketplace.title_max_chars,
        Some(&original.title),
    );
    check_field(
        &mut flags,
        "description",
        &localized.description,
        marketplace.description_max_chars,
        Some(&original.description),
    );

    if marketplace.has_bullets() {
        check_bullets(&mut flags, localized, marketplace, original);
    }

    if marketplace.has_keywords() {
        check_field(
            &mut flags,
            "keywords",
            localized.keywords.as_deref().unwrap_or(""),
            marketplace.keyword_max_chars,
            original.keywords.as_deref(),
        );
    }

    if marketplace.platform == Platform::Shopify {
        over_limit(
            &mut flags,
            "seo_meta_title",
            localized.seo_meta_title.as_deref(),
            SHOPIFY_SEO_TITLE_MAX,
        );
        over_limit(
            &mut flags,
            "seo_meta_description",
            localized.seo_meta_description.as_deref(),
            SHOPIFY_SEO_DESCRIPTION_MAX,
        );
    }

    flags
}

/// Fills `quality_flags` on every item in place.
pub fn annotate(items: &mut [LocalizationResultItem], marketplace: &MarketplaceProfile) {
    for item in items {
        item.quality_flags = check(&item.localized, marketplace, &item.original);
    }
}

fn check_bullets(
    flags: &mut Vec<QualityFlag>,
    localized: &LocalizedListing,
    marketplace: &MarketplaceProfile,
    original: &ParsedListing,
) {
    let expected = marketplace.bullet_point_count;
    let bullets = localized.bullet_points.as_deref().unwrap_or(&[]);
    let originals = original.bullet_points.as_deref().unwrap_or(&[]);

    for (idx, bullet) in bullets.iter().enumerate() {
        check_field(
            flags,
            &format!("bullet_points[{idx}]"),
            bullet,
            marketplace.bullet_point_max_chars,
            originals.get(idx).map(String::as_str),
        );
    }

    // Counted against the marketplace, not the source: a listing whose source
    // had only two bullets is still flagged when fewer than `expected` come
    // back, because the prompt asks for `expected` and the storefront shows
    // that many slots.
    if bullets.len() < expected {
        flags.push(QualityFlag::new(
            "bullet_points",
            QualityIssue::SuspiciouslyShort,
            format!(
                "expected {expected} bullet points, got {}",
                bullets.len()
            ),
        ));
    }
}

fn check_field(
    flags: &mut Vec<QualityFlag>,
    field: &str,
    value: &str,
    max_chars: usize,
    original: Option<&str>,
) {
    let value = value.trim();
    if value.is_empty() {
        flags.push(QualityFlag::new(field, QualityIssue::Empty, "Field is empty"));
        return;
    }

    let len = value.chars().count();
    if max_chars > 0 && len > max_chars {
        flags.push(QualityFlag::new(
            field,
            QualityIssue::ExceededLimit,
            format!("{len} chars (max {max_chars})"),
        ));
    }

    if let Some(original) = original {
        let original_len = original.trim().chars().count();
        if original_len > SHORT_CHECK_MIN_ORIGINAL {
            let ratio = len as f64 / original_len as f64;
            if ratio < SHORT_RATIO {
                flags.push(QualityFlag::new(
                    field,
                    QualityIssue::SuspiciouslyShort,
                    format!("{}% of original length", (ratio * 100.0).round() as u32),
                ));
            }
        }
    }
}

fn over_limit(flags: &mut Vec<QualityFlag>, field: &str, value: Option<&str>, max_chars: usize) {
    let Some(value) = value else {
        return;
    };
    let len = value.trim().chars().count();
    if len > max_chars {
        flags.push(QualityFlag::new(
            field,
            QualityIssue::ExceededLimit,
            format!("{len} chars (max {max_chars})"),
        ));
    }
}

/// Aggregate counts returned alongside a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub total_listings: usize,
    pub flagged_listings: usize,
    pub total_flags: usize,
    pub by_issue: BTreeMap<String, usize>,
}

impl QualitySummary {
    pub fn from_results(items: &[LocalizationResultItem]) -> Self {
        let mut summary = Self {
            total_listings: items.len(),
            ..Self::default()
        };
        for item in items {
            if !item.quality_flags.is_empty() {
                summary.flagged_listings += 1;
            }
            for flag in &item.quality_flags {
                summary.total_flags += 1;
                *summary
                    .by_issue
                    .entry(flag.issue.as_str().to_string())
                    .or_default() += 1;
            }
        }
        summary
    }
}

/// `"field: detail; field: detail"`, or `"OK"` when nothing was flagged.
pub fn summarize_flags(flags: &[QualityFlag]) -> String {
    if flags.is_empty() {
        return "OK".to_string();
    }
    flags
        .iter()
        .map(|flag| format!("{}: {}", flag.field, flag.detail))
        .collect::<Vec<_>>()
        .join("; ")
}
