use crate::llm::LlmConfig;
use std::time::Duration;

const MIB: usize = 1024 * 1024;

/// Runtime settings, read once at startup. Bad or missing values fall back
/// to defaults rather than failing the boot.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub request_max_bytes: usize,
    pub max_upload_bytes: usize,
    pub default_batch_size: usize,
    pub queue_capacity: usize,
    pub idempotency_ttl_secs: u64,
    pub mapping_ttl_secs: u64,
    pub redis_url: Option<String>,
    pub model_hint: Option<String>,
    pub http_timeout: Duration,
    pub http_connect_timeout: Duration,
    pub llm: LlmConfig,
    /// Raw `account:key` list; parsed by the auth layer.
    pub api_keys: Option<String>,
    pub openapi_key: Option<String>,
    pub metrics_key: Option<String>,
}

pub const MAX_BATCH_SIZE: usize = 50;

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parses settings through `lookup` so tests can feed a plain map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let positive = |key: &str, default: usize| {
            text(key)
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(default)
        };

        Self {
            port: text("PORT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(8000),
            request_max_bytes: positive("REQUEST_MAX_BYTES", 16 * MIB),
            max_upload_bytes: positive("MAX_UPLOAD_BYTES", 10 * MIB),
            default_batch_size: positive("BATCH_SIZE", 5).min(MAX_BATCH_SIZE),
            queue_capacity: positive("QUEUE_CAPACITY", 64),
            idempotency_ttl_secs: positive("IDEMPOTENCY_TTL_SECS", 3600) as u64,
            mapping_ttl_secs: positive("MAPPING_TTL_SECS", 30 * 24 * 3600) as u64,
            redis_url: text("REDIS_URL"),
            model_hint: text("LOCALIZER_MODEL"),
            http_timeout: Duration::from_secs(positive("HTTP_TIMEOUT_SECS", 60) as u64),
            http_connect_timeout: Duration::from_secs(
                positive("HTTP_CONNECT_TIMEOUT_SECS", 5) as u64
            ),
            llm: LlmConfig {
                gateway_url: text("TENSORZERO_GATEWAY_URL")
                    .unwrap_or_else(|| "http://localhost:3000".into()),
                api_key: text("TENSORZERO_API_KEY"),
                function_name: text("TENSORZERO_FUNCTION")
                    .unwrap_or_else(|| "listing_localization".into()),
                model: text("TENSORZERO_MODEL"),
            },
            api_keys: text("API_KEYS"),
            openapi_key: text("OPENAPI_KEY"),
            metrics_key: text("METRICS_KEY"),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
