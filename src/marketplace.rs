use serde::Serialize;

/// Static listing rules for one sales channel.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MarketplaceProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub platform: Platform,
    pub title_max_chars: usize,
    pub description_max_chars: usize,
    pub bullet_point_max_chars: usize,
    /// Zero means the channel has no bullet slots.
    pub bullet_point_count: usize,
    /// Zero means the channel has no keyword field.
    pub keyword_max_chars: usize,
    pub locale: &'static str,
    pub search_behavior_notes: &'static str,
    pub formatting_rules: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Amazon,
    Etsy,
    Shopify,
    Ebay,
}

impl MarketplaceProfile {
    pub fn has_bullets(&self) -> bool {
        self.bullet_point_count > 0
    }

    pub fn has_keywords(&self) -> bool {
        self.keyword_max_chars > 0
    }
}

const AMAZON_FORMATTING: &[&str] = &[
    "Start the title with the brand name when one is present in the source.",
    "Do not use ALL CAPS words except for established acronyms.",
    "Do not include promotional phrases such as \"best seller\", \"free shipping\" or \"sale\".",
    "Begin every bullet point with a short capitalized benefit phrase followed by a colon.",
    "Keywords are space separated, without commas, and must not repeat words already in the title.",
];

static PROFILES: [MarketplaceProfile; 10] = [
    MarketplaceProfile {
        id: "amazon_us",
        name: "Amazon.com",
        platform: Platform::Amazon,
        title_max_chars: 200,
        description_max_chars: 2000,
        bullet_point_max_chars: 500,
        bullet_point_count: 5,
        keyword_max_chars: 250,
        locale: "en-US",
        search_behavior_notes: "US shoppers search with short, specific noun phrases and compare specifications in bullets.",
        formatting_rules: AMAZON_FORMATTING,
    },
    MarketplaceProfile {
        id: "amazon_uk",
        name: "Amazon.co.uk",
        platform: Platform::Amazon,
        title_max_chars: 200,
        description_max_chars: 2000,
        bullet_point_max_chars: 500,
        bullet_point_count: 5,
        keyword_max_chars: 250,
        locale: "en-GB",
        search_behavior_notes: "Use British spelling and units (colour, aluminium, cm). Shoppers respond to understated, factual copy.",
        formatting_rules: AMAZON_FORMATTING,
    },
    MarketplaceProfile {
        id: "amazon_de",
        name: "Amazon.de",
        platform: Platform::Amazon,
        title_max_chars: 200,
        description_max_chars: 2000,
        bullet_point_max_chars: 500,
        bullet_point_count: 5,
        keyword_max_chars: 250,
        locale: "de-DE",
        search_behavior_notes: "German shoppers search with compound nouns (e.g. Edelstahlflasche) and expect precise technical details, materials and certifications.",
        formatting_rules: AMAZON_FORMATTING,
    },
    MarketplaceProfile {
        id: "amazon_fr",
        name: "Amazon.fr",
        platform: Platform::Amazon,
        title_max_chars: 200,
        description_max_chars: 2000,
        bullet_point_max_chars: 500,
        bullet_point_count: 5,
        keyword_max_chars: 250,
        locale: "fr-FR",
        search_behavior_notes: "French shoppers favour descriptive phrasing with the noun first, and expect metric units and French typographic spacing.",
        formatting_rules: AMAZON_FORMATTING,
    },
    MarketplaceProfile {
        id: "amazon_it",
        name: "Amazon.it",
        platform: Platform::Amazon,
        title_max_chars: 200,
        description_max_chars: 2000,
        bullet_point_max_chars: 500,
        bullet_point_count: 5,
        keyword_max_chars: 250,
        locale: "it-IT",
        search_behavior_notes: "Italian shoppers search with natural phrases and value design, quality of materials and origin.",
        formatting_rules: AMAZON_FORMATTING,
    },
    MarketplaceProfile {
        id: "amazon_es",
        name: "Amazon.es",
        platform: Platform::Amazon,
        title_max_chars: 200,
        description_max_chars: 2000,
        bullet_point_max_chars: 500,
        bullet_point_count: 5,
        keyword_max_chars: 250,
        locale: "es-ES",
        search_behavior_notes: "Spanish shoppers use Castilian vocabulary (ordenador, móvil) rather than Latin American variants.",
        formatting_rules: AMAZON_FORMATTING,
    },
    MarketplaceProfile {
        id: "amazon_jp",
        name: "Amazon.co.jp",
        platform: Platform::Amazon,
        title_max_chars: 100,
        description_max_chars: 2000,
        bullet_point_max_chars: 200,
        bullet_point_count: 5,
        keyword_max_chars: 250,
        locale: "ja-JP",
        search_behavior_notes: "Japanese shoppers search in katakana for imported product names and expect polite, detailed copy with exact dimensions.",
        formatting_rules: &[
            "Use full-width characters for Japanese text and half-width for numbers and units.",
            "Do not use promotional phrases or decorative symbols.",
            "Keywords are separated by half-width spaces.",
        ],
    },
    MarketplaceProfile {
        id: "etsy_international",
        name: "Etsy",
        platform: Platform::Etsy,
        title_max_chars: 140,
        description_max_chars: 5000,
        bullet_point_max_chars: 0,
        bullet_point_count: 0,
        keyword_max_chars: 260,
        locale: "en",
        search_behavior_notes: "Etsy buyers search for handmade, personalised and gift-oriented items; long-tail descriptive phrases perform best.",
        formatting_rules: &[
            "Put the most important search phrase in the first 40 characters of the title.",
            "Write the description as short paragraphs; no HTML.",
            "Keywords are up to 13 comma separated tags of at most 20 characters each.",
        ],
    },
    MarketplaceProfile {
        id: "shopify",
        name: "Shopify",
        platform: Platform::Shopify,
        title_max_chars: 255,
        description_max_chars: 5000,
        bullet_point_max_chars: 0,
        bullet_point_count: 0,
        keyword_max_chars: 255,
        locale: "en",
        search_behavior_notes: "Storefront traffic comes from web search; the SEO meta title and description decide the search snippet.",
        formatting_rules: &[
            "The SEO meta title must not exceed 60 characters.",
            "The SEO meta description must not exceed 160 characters.",
            "Keywords are comma separated product tags.",
        ],
    },
    MarketplaceProfile {
        id: "ebay_de",
        name: "eBay.de",
        platform: Platform::Ebay,
        title_max_chars: 80,
        description_max_chars: 4000,
        bullet_point_max_chars: 0,
        bullet_point_count: 0,
        keyword_max_chars: 0,
        locale: "de-DE",
        search_behavior_notes: "eBay search weights the title heavily; lead with brand, model and key attribute.",
        formatting_rules: &[
            "Do not use punctuation-only separators or emoji in the title.",
            "State condition and compatibility information in the description.",
        ],
    },
];

pub fn lookup(id: &str) -> Option<&'static MarketplaceProfile> {
    let wanted = id.trim();
    PROFILES
        .iter()
        .find(|profile| profile.id.eq_ignore_ascii_case(wanted))
}

pub fn all() -> &'static [MarketplaceProfile] {
    &PROFILES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let profile = lookup(" AMAZON_DE ").expect("amazon_de");
        assert_eq!(profile.title_max_chars, 200);
        assert_eq!(profile.locale, "de-DE");
    }

    #[test]
    fn lookup_unknown_id() {
        assert!(lookup("amazon_mars").is_none());
    }

    #[test]
    fn etsy_has_no_bullets() {
        let profile = lookup("etsy_international").unwrap();
        assert!(!profile.has_bullets());
        assert!(profile.has_keywords());
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<_> = all().iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), all().len());
    }
}
