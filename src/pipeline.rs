use crate::catalog::{self, ColumnMapping, ParsedListing, RawTable};
use crate::config::{AppConfig, MAX_BATCH_SIZE};
use crate::llm::{Generator, LlmClient};
use crate::localize::{self, BatchOutcome, LocalizationResultItem, QualitySummary};
use crate::marketplace::{self, MarketplaceProfile};
use crate::models::{LocalizationRequest, LocalizationResponse, SourceInput, StageReport};
use crate::security::AuthContext;
use serde_json::{Value, json};
use std::{future::Future, sync::Arc, time::Instant};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub struct Pipeline<G = LlmClient> {
    pub config: Arc<PipelineConfig>,
    generator: Arc<G>,
}

impl<G> Clone for Pipeline<G> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            generator: self.generator.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_upload_bytes: usize,
    pub default_batch_size: usize,
    pub model_hint: Option<String>,
}

impl PipelineConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            default_batch_size: config.default_batch_size,
            model_hint: config.model_hint.clone(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

impl Pipeline<LlmClient> {
    pub fn from_config(config: &AppConfig) -> Self {
        let llm = LlmClient::new(
            config.llm.clone(),
            config.http_timeout,
            config.http_connect_timeout,
        );
        Self::new(PipelineConfig::from_app(config), Arc::new(llm))
    }
}

impl<G: Generator> Pipeline<G> {
    pub fn new(config: PipelineConfig, generator: Arc<G>) -> Self {
        Self {
            config: Arc::new(config),
            generator,
        }
    }

    /// Runs one localization job: marketplace check, ingest, mapping,
    /// normalization, batched generation, then quality flags.
    pub async fn run(
        &self,
        request: LocalizationRequest,
        auth: Option<AuthContext>,
    ) -> Result<LocalizationResponse, PipelineError> {
        let profile = marketplace::lookup(&request.marketplace).ok_or_else(|| {
            PipelineError::invalid_input(
                "marketplace",
                format!("unknown marketplace `{}`", request.marketplace.trim()),
            )
        })?;
        if request.target_language.trim().is_empty() {
            return Err(PipelineError::invalid_input(
                "target_language",
                "target_language is required",
            ));
        }

        let job_id = Uuid::new_v4().to_string();
        let account_id = auth.map(|ctx| ctx.account_id);
        info!(
            target = "hermes.localize",
            job_id = %job_id,
            marketplace = profile.id,
            account_id = account_id.as_deref().unwrap_or("anonymous"),
            "localization_started"
        );

        let mut stages = Vec::new();
        let max_upload_bytes = self.config.max_upload_bytes;

        let table = self
            .capture_stage("ingest", &mut stages, async {
                stages::ingest(&request.source, max_upload_bytes)
            })
            .await?;

        let mappings = self
            .capture_stage("map_columns", &mut stages, async {
                stages::map_columns(&table, request.mappings.as_deref())
            })
            .await?;

        let listings = self
            .capture_stage("normalize", &mut stages, async {
                stages::normalize(&table, &mappings)
            })
            .await?;

        let batch_size = request
            .batch_size
            .unwrap_or(self.config.default_batch_size)
            .clamp(1, MAX_BATCH_SIZE);
        let model_hint = request
            .model
            .as_deref()
            .or(self.config.model_hint.as_deref());
        let BatchOutcome { items, usage } = self
            .capture_stage(
                "localize",
                &mut stages,
                stages::localize(
                    self.generator.as_ref(),
                    &listings,
                    profile,
                    &request.target_language,
                    batch_size,
                    model_hint,
                ),
            )
            .await?;

        let (results, quality) = self
            .capture_stage("quality_check", &mut stages, async {
                stages::quality_check(items, profile)
            })
            .await?;

        info!(
            target = "hermes.localize",
            job_id = %job_id,
            listings = results.len(),
            flagged = quality.flagged_listings,
            failures = usage.generation_failures,
            "localization_completed"
        );

        Ok(LocalizationResponse {
            job_id,
            marketplace: profile.id.to_string(),
            target_language: request.target_language,
            account_id,
            mappings,
            results,
            raw_table: table,
            quality,
            usage,
            stages,
        })
    }

    async fn capture_stage<T, Fut>(
        &self,
        name: &'static str,
        stages: &mut Vec<StageReport>,
        fut: Fut,
    ) -> Result<T, PipelineError>
    where
        Fut: Future<Output = Result<StageOutcome<T>, PipelineError>>,
    {
        let started = Instant::now();
        let outcome = fut.await?;
        let elapsed_ms = started.elapsed().as_millis();
        crate::metrics::stage_elapsed(name, elapsed_ms);
        stages.push(StageReport::new(name, elapsed_ms, outcome.output));
        Ok(outcome.value)
    }
}

#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {message}")]
pub struct PipelineError {
    stage: &'static str,
    message: String,
    kind: PipelineErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    InvalidInput,
    Internal,
}

impl PipelineError {
    pub fn invalid_input(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            kind: PipelineErrorKind::InvalidInput,
        }
    }

    pub fn internal(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            kind: PipelineErrorKind::Internal,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn kind(&self) -> PipelineErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.message
    }
}

#[derive(Debug)]
pub struct StageOutcome<T> {
    pub value: T,
    pub output: Value,
}

impl<T> StageOutcome<T> {
    fn new(value: T, output: Value) -> Self {
        Self { value, output }
    }
}

pub mod stages {
    use super::*;

    pub fn ingest(
        source: &SourceInput,
        max_upload_bytes: usize,
    ) -> Result<StageOutcome<RawTable>, PipelineError> {
        match source {
            SourceInput::Upload(upload) => {
                let bytes = upload.decode().map_err(|err| {
                    PipelineError::invalid_input("ingest", format!("content_base64: {err}"))
                })?;
                let parsed = catalog::ingest::parse(&bytes, &upload.filename, max_upload_bytes)
                    .map_err(|err| PipelineError::invalid_input("ingest", err.to_string()))?;
                let output = json!({
                    "source": "upload",
                    "format": parsed.format,
                    "bytes": bytes.len(),
                    "headers": parsed.table.headers,
                    "rows": parsed.table.rows.len(),
                });
                Ok(StageOutcome::new(parsed.table, output))
            }
            SourceInput::Rows(table) => {
                let output = json!({
                    "source": "rows",
                    "headers": table.headers,
                    "rows": table.rows.len(),
                });
                Ok(StageOutcome::new(table.clone(), output))
            }
        }
    }

    /// Supplied mappings are checked against the headers; otherwise they
    /// are inferred from header names.
    pub fn map_columns(
        table: &RawTable,
        supplied: Option<&[ColumnMapping]>,
    ) -> Result<StageOutcome<Vec<ColumnMapping>>, PipelineError> {
        let (mappings, origin) = match supplied {
            Some(mappings) => (mappings.to_vec(), "supplied"),
            None => (catalog::auto_detect_columns(&table.headers), "auto_detected"),
        };
        catalog::validate_against_headers(&mappings, &table.headers)
            .map_err(|err| PipelineError::invalid_input("map_columns", err.to_string()))?;
        let output = json!({
            "origin": origin,
            "mappings": mappings,
        });
        Ok(StageOutcome::new(mappings, output))
    }

    pub fn normalize(
        table: &RawTable,
        mappings: &[ColumnMapping],
    ) -> Result<StageOutcome<Vec<ParsedListing>>, PipelineError> {
        let listings = catalog::normalize::apply(&table.rows, mappings);
        if listings.is_empty() {
            return Err(PipelineError::invalid_input(
                "normalize",
                "upload contains no listings",
            ));
        }
        let with_bullets = listings
            .iter()
            .filter(|listing| listing.bullet_points.is_some())
            .count();
        let output = json!({
            "listings": listings.len(),
            "with_bullets": with_bullets,
        });
        Ok(StageOutcome::new(listings, output))
    }

    pub async fn localize<G: Generator>(
        generator: &G,
        listings: &[ParsedListing],
        profile: &MarketplaceProfile,
        target_language: &str,
        batch_size: usize,
        model_hint: Option<&str>,
    ) -> Result<StageOutcome<BatchOutcome>, PipelineError> {
        let language = localize::prompt::language_name(target_language);
        let outcome = localize::batch::run(
            generator,
            listings,
            profile,
            target_language,
            batch_size,
            model_hint,
        )
        .await;
        let output = json!({
            "language": language,
            "batch_size": batch_size,
            "batches": listings.len().div_ceil(batch_size),
            "model": model_hint,
            "usage": outcome.usage,
        });
        Ok(StageOutcome::new(outcome, output))
    }

    pub fn quality_check(
        mut items: Vec<LocalizationResultItem>,
        profile: &MarketplaceProfile,
    ) -> Result<StageOutcome<(Vec<LocalizationResultItem>, QualitySummary)>, PipelineError> {
        localize::quality::annotate(&mut items, profile);
        let summary = QualitySummary::from_results(&items);
        crate::metrics::flags_raised(profile.id, summary.total_flags);
        let output = json!(summary);
        Ok(StageOutcome::new((items, summary), output))
    }
}
