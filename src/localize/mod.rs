pub mod batch;
pub mod models;
pub mod prompt;
pub mod quality;

pub use batch::{BatchOutcome, GenerationUsage};
pub use models::{LocalizationResultItem, LocalizedListing, QualityFlag, QualityIssue};
pub use quality::QualitySummary;
