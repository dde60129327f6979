use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::warn;

const MAX_LOCAL_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

/// Namespaced JSON store: Redis when configured, otherwise a process-local
/// map. Both honor the TTL given to `set`. Redis failures degrade to cache
/// misses.
#[derive(Clone)]
pub struct JsonCache {
    namespace: &'static str,
    redis: Option<redis::Client>,
    local: Arc<Mutex<HashMap<String, LocalEntry>>>,
}

struct LocalEntry {
    json: String,
    expires_at: Instant,
}

impl JsonCache {
    pub fn new(namespace: &'static str, redis: Option<redis::Client>) -> Self {
        Self {
            namespace,
            redis,
            local: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("hermes:{}:{key}", self.namespace)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match &self.redis {
            Some(client) => redis_get(client, &self.key(key)).await,
            None => {
                let mut local = self.local.lock().await;
                let now = Instant::now();
                let fresh = local
                    .get(key)
                    .filter(|entry| entry.expires_at > now)
                    .map(|entry| entry.json.clone());
                if fresh.is_none() {
                    local.remove(key);
                }
                fresh
            }
        }?;
        serde_json::from_str(&raw).ok()
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let Ok(json) = serde_json::to_string(value) else {
            return;
        };
        match &self.redis {
            Some(client) => redis_set(client, &self.key(key), json, ttl_secs).await,
            None => {
                let mut local = self.local.lock().await;
                let now = Instant::now();
                local.retain(|_, entry| entry.expires_at > now);
                local.insert(
                    key.to_string(),
                    LocalEntry {
                        json,
                        expires_at: now + Duration::from_secs(ttl_secs.min(MAX_LOCAL_TTL_SECS)),
                    },
                );
            }
        }
    }
}

async fn redis_get(client: &redis::Client, key: &str) -> Option<String> {
    let mut conn = match client.get_multiplexed_async_connection().await {
        Ok(c) => c,
        Err(err) => {
            warn!(target = "hermes.api", error = %err, "redis_unavailable");
            return None;
        }
    };
    let value: Option<String> = conn.get(key).await.ok()?;
    value
}

async fn redis_set(client: &redis::Client, key: &str, json: String, ttl_secs: u64) {
    let mut conn = match client.get_multiplexed_async_connection().await {
        Ok(c) => c,
        Err(err) => {
            warn!(target = "hermes.api", error = %err, "redis_unavailable");
            return;
        }
    };
    // SET EX rejects a zero expiry.
    let result: Result<(), redis::RedisError> = conn.set_ex(key, json, ttl_secs.max(1)).await;
    if let Err(err) = result {
        warn!(target = "hermes.api", key, error = %err, "redis_write_failed");
    }
}
