use crate::catalog::ParsedListing;
use crate::marketplace::MarketplaceProfile;
use std::fmt::Write;

/// Terms that stay as-is in every language.
const UNIVERSAL_TERMS: &[&str] = &[
    "USB", "USB-C", "HDMI", "Bluetooth", "Wi-Fi", "WiFi", "LED", "LCD", "OLED", "GPS", "NFC",
    "4K", "HD", "RGB", "SSD", "RAM", "CPU", "iPhone", "iPad", "Android", "iOS", "Windows",
    "macOS", "Qi", "PVC", "BPA", "mAh", "W", "V",
];

/// English words generic translators tend to leave untranslated.
const ALWAYS_TRANSLATE: &[&str] = &[
    "Premium", "Professional", "Smart", "Design", "Outdoor", "Indoor", "Set", "Pack", "Kit",
    "Comfort", "Style", "Home", "Kitchen", "Travel", "Sport", "Easy", "Ultra", "Extra",
    "Power", "Case", "Cover", "Holder", "Stand", "Organizer",
];

const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("de", "German"),
    ("en", "English"),
    ("fr", "French"),
    ("it", "Italian"),
    ("es", "Spanish"),
    ("nl", "Dutch"),
    ("sv", "Swedish"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ja", "Japanese"),
    ("tr", "Turkish"),
    ("da", "Danish"),
    ("fi", "Finnish"),
    ("no", "Norwegian"),
    ("nb", "Norwegian"),
    ("cs", "Czech"),
];

/// `de`, `de-DE` and `German` all resolve to `German`; unknown values pass through.
pub fn language_name(input: &str) -> String {
    let trimmed = input.trim();
    let code = trimmed
        .split(['-', '_'])
        .next()
        .unwrap_or(trimmed)
        .to_ascii_lowercase();
    LANGUAGE_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizationPrompt {
    pub system_message: String,
    pub user_message: String,
}

/// Builds the generation request for one listing. Pure: identical inputs
/// always produce identical text.
pub fn build_localization_prompt(
    marketplace: &MarketplaceProfile,
    listing: &ParsedListing,
    target_language: &str,
) -> LocalizationPrompt {
    let language = language_name(target_language);
    LocalizationPrompt {
        system_message: system_message(marketplace, &language),
        user_message: user_message(marketplace, listing, &language),
    }
}

fn system_message(marketplace: &MarketplaceProfile, language: &str) -> String {
    format!(
        "You are an expert e-commerce localization specialist for {name} ({locale}). \
You rewrite product listings into fluent, native {language} that ranks well in marketplace search \
and reads as if written by a local copywriter, never as a literal translation.\n\
Marketplace search behavior: {notes}\n\
You always answer with a single JSON object and nothing else.",
        name = marketplace.name,
        locale = marketplace.locale,
        notes = marketplace.search_behavior_notes,
    )
}

fn user_message(marketplace: &MarketplaceProfile, listing: &ParsedListing, language: &str) -> String {
    let bullets = marketplace.bullet_point_count;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Localize the following product listing into {language} for {}.\n",
        marketplace.name
    );

    out.push_str("CHARACTER LIMITS (hard maximums, count every character):\n");
    let _ = writeln!(out, "- Title: {} characters", marketplace.title_max_chars);
    let _ = writeln!(
        out,
        "- Description: {} characters",
        marketplace.description_max_chars
    );
    if bullets > 0 && marketplace.bullet_point_max_chars > 0 {
        let _ = writeln!(
            out,
            "- Each bullet point: {} characters",
            marketplace.bullet_point_max_chars
        );
    }
    if marketplace.keyword_max_chars > 0 {
        let _ = writeln!(
            out,
            "- Keywords (total): {} characters",
            marketplace.keyword_max_chars
        );
    }
    out.push('\n');

    if bullets > 0 {
        out.push_str("BULLET POINTS:\n");
        let _ = writeln!(
            out,
            "- Return EXACTLY {bullets} bullet points in `bullet_points`. Never fewer, never an empty array."
        );
        out.push_str(
            "- If the original has fewer bullet points, or a slot below is marked empty, write a relevant \
bullet from the title and description so that every slot is filled.\n\n",
        );
    }

    out.push_str("TRANSLATION RULES:\n");
    let _ = writeln!(
        out,
        "- Every word must be rendered in {language}. Do not leave English words in the output."
    );
    let _ = writeln!(
        out,
        "- Only these universal technical terms and any brand or model names may stay unchanged: {}.",
        UNIVERSAL_TERMS.join(", ")
    );
    let _ = writeln!(
        out,
        "- These words must always be translated, even though they are common in English product copy: {}.",
        ALWAYS_TRANSLATE.join(", ")
    );
    out.push_str(
        "- For languages that join nouns into compound words, include both the compound form and the \
separated form of multi-word technical terms among the keywords.\n\n",
    );

    if !marketplace.formatting_rules.is_empty() {
        out.push_str("FORMATTING RULES:\n");
        for rule in marketplace.formatting_rules {
            let _ = writeln!(out, "- {rule}");
        }
        out.push('\n');
    }

    out.push_str("ORIGINAL LISTING:\n");
    let _ = writeln!(out, "Title: {}", listing.title);
    let _ = writeln!(out, "Description: {}", listing.description);
    if bullets > 0 {
        out.push_str("Bullet points:\n");
        for (idx, bullet) in padded_bullets(listing, bullets).iter().enumerate() {
            if bullet.trim().is_empty() {
                let _ = writeln!(out, "{}. [empty - generate a relevant bullet]", idx + 1);
            } else {
                let _ = writeln!(out, "{}. {bullet}", idx + 1);
            }
        }
    }
    let _ = writeln!(
        out,
        "Keywords: {}",
        listing.keywords.as_deref().unwrap_or("")
    );
    out.push('\n');

    out.push_str("OUTPUT FORMAT:\nRespond with one JSON object shaped exactly like this:\n");
    out.push_str(&output_schema(bullets));
    out
}

/// The original bullets padded with empty slots up to `count`.
pub fn padded_bullets(listing: &ParsedListing, count: usize) -> Vec<String> {
    let mut bullets = listing.bullet_points.clone().unwrap_or_default();
    if bullets.len() < count {
        bullets.resize(count, String::new());
    }
    bullets
}

fn output_schema(bullets: usize) -> String {
    let mut schema = String::from("{\n  \"title\": \"...\",\n  \"description\": \"...\",\n");
    if bullets > 0 {
        let slots = vec!["\"...\""; bullets].join(", ");
        let _ = writeln!(schema, "  \"bullet_points\": [{slots}],");
    }
    schema.push_str(
        "  \"keywords\": \"...\",\n  \"seo_meta_title\": \"...\",\n  \"seo_meta_description\": \"...\"\n}\n",
    );
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace;

    fn listing() -> ParsedListing {
        ParsedListing {
            title: "Brass desk lamp".into(),
            description: "A warm dimmable desk lamp with USB-C charging port.".into(),
            bullet_points: Some(vec![
                "Dimmable warm light".into(),
                String::new(),
                "Solid brass".into(),
                String::new(),
                String::new(),
            ]),
            keywords: Some("lamp brass desk".into()),
            ..ParsedListing::default()
        }
    }

    #[test]
    fn amazon_prompt_demands_exact_bullet_count_and_limits() {
        let profile = marketplace::lookup("amazon_de").unwrap();
        let prompt = build_localization_prompt(profile, &listing(), "German");
        let user = &prompt.user_message;
        assert!(user.contains("- Title: 200 characters"));
        assert!(user.contains("- Each bullet point: 500 characters"));
        assert!(user.contains("- Keywords (total): 250 characters"));
        assert!(user.contains("Return EXACTLY 5 bullet points"));
        assert!(user.contains("1. Dimmable warm light"));
        assert!(user.contains("2. [empty - generate a relevant bullet]"));
        assert!(user.contains("5. [empty - generate a relevant bullet]"));
        assert!(user.contains("\"bullet_points\": [\"...\", \"...\", \"...\", \"...\", \"...\"]"));
        assert!(prompt.system_message.contains("Amazon.de (de-DE)"));
    }

    #[test]
    fn listing_without_bullets_still_gets_every_slot() {
        let profile = marketplace::lookup("amazon_fr").unwrap();
        let mut source = listing();
        source.bullet_points = None;
        let prompt = build_localization_prompt(profile, &source, "fr");
        assert_eq!(
            prompt
                .user_message
                .matches("[empty - generate a relevant bullet]")
                .count(),
            5
        );
        assert!(prompt.user_message.contains("into French"));
    }

    #[test]
    fn etsy_prompt_has_no_bullet_instructions() {
        let profile = marketplace::lookup("etsy_international").unwrap();
        let prompt = build_localization_prompt(profile, &listing(), "German");
        let user = prompt.user_message.to_lowercase();
        assert!(!user.contains("bullet"));
        assert!(!prompt.user_message.contains("bullet_points"));
        assert!(prompt.user_message.contains("\"seo_meta_description\""));
    }

    #[test]
    fn keyword_limit_omitted_when_marketplace_has_none() {
        let profile = marketplace::lookup("ebay_de").unwrap();
        let prompt = build_localization_prompt(profile, &listing(), "German");
        assert!(!prompt.user_message.contains("Keywords (total)"));
        assert!(prompt.user_message.contains("- Title: 80 characters"));
    }

    #[test]
    fn formatting_rules_are_copied_in_order() {
        let profile = marketplace::lookup("amazon_us").unwrap();
        let prompt = build_localization_prompt(profile, &listing(), "English");
        let positions: Vec<usize> = profile
            .formatting_rules
            .iter()
            .map(|rule| prompt.user_message.find(rule).expect("rule present"))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn translation_rules_list_allow_and_deny_terms() {
        let profile = marketplace::lookup("amazon_it").unwrap();
        let prompt = build_localization_prompt(profile, &listing(), "Italian");
        assert!(prompt.user_message.contains("USB-C"));
        assert!(prompt.user_message.contains("Premium, Professional"));
        assert!(prompt.user_message.contains("compound form"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let profile = marketplace::lookup("amazon_es").unwrap();
        let a = build_localization_prompt(profile, &listing(), "es-ES");
        let b = build_localization_prompt(profile, &listing(), "es-ES");
        assert_eq!(a, b);
    }

    #[test]
    fn language_codes_resolve_to_names() {
        assert_eq!(language_name("de-DE"), "German");
        assert_eq!(language_name("ja"), "Japanese");
        assert_eq!(language_name("Klingon"), "Klingon");
    }
}
