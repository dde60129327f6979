pub mod columns;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod xlsx;

pub use columns::{MappingError, auto_detect_columns, header_fingerprint, validate_against_headers};
pub use ingest::IngestError;
pub use models::{ColumnMapping, ParsedListing, ParsedUpload, RawRow, RawTable, TargetField};
