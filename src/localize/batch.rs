use crate::catalog::ParsedListing;
use crate::llm::{Generator, LlmUsage};
use crate::localize::models::{LocalizationResultItem, LocalizedListing};
use crate::localize::prompt::build_localization_prompt;
use crate::marketplace::MarketplaceProfile;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ResponseParseError {
    #[error("response contains no JSON object")]
    NoJsonObject,
    #[error("response JSON does not match the listing shape: {0}")]
    Json(#[from] serde_json::Error),
}

/// Generation totals handed back to the caller for persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationUsage {
    pub listings: usize,
    pub generation_calls: usize,
    pub generation_failures: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl GenerationUsage {
    fn record(&mut self, attempt: &Attempt) {
        self.listings += 1;
        self.generation_calls += 1;
        if !attempt.succeeded {
            self.generation_failures += 1;
        }
        if let Some(usage) = attempt.usage {
            self.input_tokens += u64::from(usage.input_tokens.unwrap_or(0));
            self.output_tokens += u64::from(usage.output_tokens.unwrap_or(0));
        }
    }
}

#[derive(Debug)]
pub struct BatchOutcome {
    /// Same order as the input listings; flags are not filled in yet.
    pub items: Vec<LocalizationResultItem>,
    pub usage: GenerationUsage,
}

struct Attempt {
    localized: LocalizedListing,
    succeeded: bool,
    usage: Option<LlmUsage>,
}

/// Localizes `listings` in contiguous batches of `batch_size`.
///
/// Batches run one after another; members of a batch run concurrently and
/// the whole batch is awaited before the next one starts, so at most
/// `batch_size` generations are in flight. A failed or unparseable
/// generation degrades that listing to empty text and never aborts its
/// siblings.
pub async fn run<G: Generator>(
    generator: &G,
    listings: &[ParsedListing],
    marketplace: &MarketplaceProfile,
    target_language: &str,
    batch_size: usize,
    model_hint: Option<&str>,
) -> BatchOutcome {
    let batch_size = batch_size.max(1);
    let mut items = Vec::with_capacity(listings.len());
    let mut usage = GenerationUsage::default();

    for (batch_index, batch) in listings.chunks(batch_size).enumerate() {
        debug!(
            target = "hermes.localize",
            batch = batch_index,
            size = batch.len(),
            "batch_started"
        );
        let attempts = join_all(batch.iter().map(|listing| {
            localize_one(generator, listing, marketplace, target_language, model_hint)
        }))
        .await;

        // join_all yields in input order regardless of completion order.
        for (listing, attempt) in batch.iter().zip(attempts) {
            usage.record(&attempt);
            items.push(LocalizationResultItem {
                source_row: listing.source_row,
                original: listing.clone(),
                localized: attempt.localized,
                quality_flags: Vec::new(),
            });
        }
    }

    BatchOutcome { items, usage }
}

async fn localize_one<G: Generator>(
    generator: &G,
    listing: &ParsedListing,
    marketplace: &MarketplaceProfile,
    target_language: &str,
    model_hint: Option<&str>,
) -> Attempt {
    let prompt = build_localization_prompt(marketplace, listing, target_language);
    let response = match generator
        .generate(&prompt.system_message, &prompt.user_message, model_hint)
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!(
                target = "hermes.localize",
                source_row = listing.source_row,
                error = %err,
                "generation_failed"
            );
            return Attempt {
                localized: LocalizedListing::default(),
                succeeded: false,
                usage: None,
            };
        }
    };

    match parse_localized(&response.text) {
        Ok(localized) => Attempt {
            localized,
            succeeded: true,
            usage: response.usage,
        },
        Err(err) => {
            warn!(
                target = "hermes.localize",
                source_row = listing.source_row,
                error = %err,
                "generation_unparseable"
            );
            Attempt {
                localized: LocalizedListing::default(),
                succeeded: false,
                usage: response.usage,
            }
        }
    }
}

/// Extracts the listing object from raw generator text, tolerating code
/// fences and prose around the JSON.
pub fn parse_localized(text: &str) -> Result<LocalizedListing, ResponseParseError> {
    let cleaned = strip_markdown_fence(text);
    let start = cleaned.find('{').ok_or(ResponseParseError::NoJsonObject)?;
    let end = cleaned.rfind('}').ok_or(ResponseParseError::NoJsonObject)?;
    if end < start {
        return Err(ResponseParseError::NoJsonObject);
    }
    Ok(serde_json::from_str(&cleaned[start..=end])?)
}

fn strip_markdown_fence(input: &str) -> String {
    let trimmed = input.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut body = Vec::new();
    for line in trimmed.lines().skip(1) {
        if line.trim_start().starts_with("```") {
            break;
        }
        body.push(line);
    }
    body.join("\n")
}
