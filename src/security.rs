use crate::models::ApiError;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{self, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{collections::HashMap, convert::Infallible, sync::Arc};
use tracing::{info, warn};

const DEMO_KEYS: &str = "demo-account:demo-key";

#[derive(Clone)]
pub struct AuthState {
    records: Arc<HashMap<String, AccountRecord>>,
}

/// Caller identity attached to authenticated requests.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub account_id: String,
    pub api_key_id: String,
}

#[derive(Clone)]
struct AccountRecord {
    account_id: String,
    api_key_id: String,
}

impl AuthState {
    /// `raw` is a comma-separated `account:key` list; unset falls back to
    /// the demo key.
    pub fn from_keys(raw: Option<&str>) -> Self {
        Self {
            records: Arc::new(load_keys(raw.unwrap_or(DEMO_KEYS))),
        }
    }

    fn authenticate(&self, presented: &str) -> Option<AuthContext> {
        self.records.get(presented).map(|record| AuthContext {
            account_id: record.account_id.clone(),
            api_key_id: record.api_key_id.clone(),
        })
    }
}

pub async fn require_api_auth(
    State(state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Infallible> {
    let Some(presented) = extract_api_key(request.headers()) else {
        let response =
            unauthorized_response("missing_api_key", "Provide X-Hermes-Key or Bearer token");
        return Ok(response);
    };

    let Some(context) = state.authenticate(&presented) else {
        let response = unauthorized_response("invalid_api_key", "Key not recognized");
        return Ok(response);
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

fn extract_api_key(headers: &http::HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(http::header::AUTHORIZATION)
        && let Ok(raw) = value.to_str()
        && raw.len() >= 7
        && raw[..6].eq_ignore_ascii_case("bearer")
    {
        return Some(raw[6..].trim().to_string());
    }
    headers
        .get("X-Hermes-Key")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn unauthorized_response(code: &str, message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiError::new(code, message))).into_response()
}

fn load_keys(raw: &str) -> HashMap<String, AccountRecord> {
    let mut entries = HashMap::new();
    for (idx, token) in raw.split(',').enumerate() {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.splitn(2, ':');
        let account_id = parts.next().map(str::trim).filter(|s| !s.is_empty());
        let key = parts.next().map(str::trim).filter(|s| !s.is_empty());
        match (account_id, key) {
            (Some(account), Some(secret)) => {
                let record = AccountRecord {
                    account_id: account.to_string(),
                    api_key_id: format!("key-{:02}", idx + 1),
                };
                entries.insert(secret.to_string(), record);
            }
            // Entries can hold secrets; log the position only.
            _ => warn!(
                target = "hermes.api",
                entry = idx + 1,
                "ignored malformed API_KEYS entry"
            ),
        }
    }

    if entries.is_empty() {
        warn!(
            target = "hermes.api",
            "API_KEYS produced no keys; falling back to demo credentials"
        );
        return load_keys(DEMO_KEYS);
    }

    info!(
        target = "hermes.api",
        key_count = entries.len(),
        "loaded API keys"
    );
    entries
}
