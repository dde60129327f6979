mod cache;
mod catalog;
mod config;
mod export;
mod http;
mod jobs;
mod llm;
mod localize;
mod marketplace;
mod metrics;
mod models;
mod pipeline;
mod security;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Extension, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cache::JsonCache;
use config::AppConfig;
use eyre::WrapErr;
use export::ExportError;
use marketplace::MarketplaceProfile;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use models::{
    ApiError, ExportRequest, InspectResponse, LocalizationRequest, LocalizationResponse,
    MappingDocument, UploadPayload,
};
use pipeline::{Pipeline, PipelineError, PipelineErrorKind};
use security::{AuthContext, AuthState, require_api_auth};
use serde::Serialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const OPENAPI_YAML: &str = include_str!("../docs/openapi.yaml");
const PREVIEW_ROWS: usize = 5;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "hermes.api", "server crashed: {err:?}");
    }
}

async fn run() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env();
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .wrap_err("install prometheus recorder")?;
    let auth_state = AuthState::from_keys(config.api_keys.as_deref());
    let port = config.port;
    let app = build_router(AppState::new(config, prometheus_handle), auth_state);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(target = "hermes.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("bind {addr}"))?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    config: Arc<AppConfig>,
    pipeline: Pipeline,
    queue: jobs::JobQueue,
    openapi: Arc<serde_json::Value>,
    prometheus_handle: PrometheusHandle,
    idempotency: JsonCache,
    mappings: JsonCache,
}

impl AppState {
    fn new(config: AppConfig, prometheus_handle: PrometheusHandle) -> Self {
        let redis = config
            .redis_url
            .as_deref()
            .and_then(|url| match redis::Client::open(url) {
                Ok(client) => Some(client),
                Err(err) => {
                    warn!(target = "hermes.api", error = %err, "invalid REDIS_URL; using in-process cache");
                    None
                }
            });
        let pipeline = Pipeline::from_config(&config);
        let (queue, _worker) = jobs::JobQueue::spawn(pipeline.clone(), config.queue_capacity);
        let openapi = serde_yaml::from_str(OPENAPI_YAML)
            .unwrap_or_else(|_| json!({"openapi": "3.0.3"}));

        Self {
            config: Arc::new(config),
            pipeline,
            queue,
            openapi: Arc::new(openapi),
            prometheus_handle,
            idempotency: JsonCache::new("idempotency", redis.clone()),
            mappings: JsonCache::new("mappings", redis),
        }
    }
}

fn build_router(state: AppState, auth_state: AuthState) -> Router {
    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);
    let body_limit = state.config.request_max_bytes;

    let protected = Router::new()
        .route("/uploads/inspect", post(inspect_upload))
        .route("/mappings/{fingerprint}", get(get_mapping).put(put_mapping))
        .route("/localizations", post(create_localization))
        .route("/exports", post(create_export))
        .nest(
            "/jobs",
            Router::new()
                .route("/localizations", post(enqueue_localization_job))
                .route("/{id}", get(get_job_status)),
        )
        .route_layer(middleware::from_fn_with_state(auth_state, require_api_auth));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/openapi.json", get(openapi_json))
        .route("/marketplaces", get(list_marketplaces))
        .route("/marketplaces/{id}", get(get_marketplace))
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
}

/// Health and readiness check.
///
/// - Method: `GET`
/// - Path: `/health`
/// - Auth: none
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "hermes-localizer",
    }))
}

async fn openapi_json(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(key) = &state.config.openapi_key {
        let presented = headers
            .get("X-Docs-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != key {
            return Err(PipelineError::invalid_input("docs", "unauthorized").into());
        }
    }
    Ok(Json((*state.openapi).clone()))
}

async fn metrics_endpoint(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(secret) = &state.config.metrics_key {
        let presented = headers
            .get("X-Metrics-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != secret {
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus_handle.render(),
    )
        .into_response()
}

async fn list_marketplaces() -> Json<&'static [MarketplaceProfile]> {
    crate::metrics::inc_requests("/marketplaces");
    Json(marketplace::all())
}

async fn get_marketplace(Path(id): Path<String>) -> Result<Json<MarketplaceProfile>, AppError> {
    crate::metrics::inc_requests("/marketplaces/{id}");
    marketplace::lookup(&id)
        .copied()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(ApiError::new("marketplace", format!("unknown marketplace `{id}`"))))
}

/// Parse an upload and suggest column mappings without running generation.
///
/// - Method: `POST`
/// - Path: `/uploads/inspect`
/// - Body: `{ filename, content_base64 }`
async fn inspect_upload(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<UploadPayload>,
) -> Result<Json<InspectResponse>, AppError> {
    crate::metrics::inc_requests("/uploads/inspect");
    let bytes = payload
        .decode()
        .map_err(|err| PipelineError::invalid_input("inspect", format!("content_base64: {err}")))?;
    let upload = catalog::ingest::parse(&bytes, &payload.filename, state.config.max_upload_bytes)
        .map_err(|err| PipelineError::invalid_input("inspect", err.to_string()))?;

    let fingerprint = catalog::header_fingerprint(&upload.table.headers);
    let saved = state
        .mappings
        .get::<MappingDocument>(&mapping_key(&context, &fingerprint))
        .await
        .map(|doc| doc.mappings);
    info!(
        target = "hermes.api",
        account_id = %context.account_id,
        rows = upload.table.rows.len(),
        saved_mapping = saved.is_some(),
        "upload inspected"
    );

    Ok(Json(InspectResponse {
        format: upload.format,
        row_count: upload.table.rows.len(),
        preview: upload.table.rows.iter().take(PREVIEW_ROWS).cloned().collect(),
        suggested_mappings: catalog::auto_detect_columns(&upload.table.headers),
        fingerprint,
        saved_mappings: saved,
        headers: upload.table.headers,
    }))
}

fn mapping_key(context: &AuthContext, fingerprint: &str) -> String {
    format!("{}:{}", context.account_id, fingerprint.trim())
}

async fn get_mapping(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(fingerprint): Path<String>,
) -> Result<Json<MappingDocument>, AppError> {
    state
        .mappings
        .get::<MappingDocument>(&mapping_key(&context, &fingerprint))
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(ApiError::new("mappings", "no mapping saved for this fingerprint")))
}

async fn put_mapping(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(fingerprint): Path<String>,
    Json(payload): Json<MappingDocument>,
) -> Result<Json<MappingDocument>, AppError> {
    crate::metrics::inc_requests("/mappings/{fingerprint}");
    catalog::columns::validate_mappings(&payload.mappings)
        .map_err(|err| PipelineError::invalid_input("mappings", err.to_string()))?;
    let document = MappingDocument {
        fingerprint: fingerprint.trim().to_string(),
        mappings: payload.mappings,
    };
    state
        .mappings
        .set(
            &mapping_key(&context, &fingerprint),
            &document,
            state.config.mapping_ttl_secs,
        )
        .await;
    Ok(Json(document))
}

/// Run the upload → localized listings pipeline.
///
/// - Method: `POST`
/// - Path: `/localizations`
/// - Auth: `Authorization: Bearer <key>` or `X-Hermes-Key: <key>`
/// - Body: `LocalizationRequest`
/// - Response: `LocalizationResponse` (results, quality summary, usage, stage transcript)
async fn create_localization(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Json(payload): Json<LocalizationRequest>,
) -> Result<Json<LocalizationResponse>, AppError> {
    crate::metrics::inc_requests("/localizations");
    info!(
        target = "hermes.api",
        account_id = %context.account_id,
        api_key = %context.api_key_id,
        marketplace = %payload.marketplace,
        "localization pipeline invoked",
    );

    let idempotency_key = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|key| format!("{}:{key}", context.account_id));

    if let Some(key) = &idempotency_key
        && let Some(existing) = state.idempotency.get::<LocalizationResponse>(key).await
    {
        return Ok(Json(existing));
    }

    let response = state.pipeline.run(payload, Some(context)).await?;

    if let Some(key) = &idempotency_key {
        state
            .idempotency
            .set(key, &response, state.config.idempotency_ttl_secs)
            .await;
    }
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct EnqueueResponse {
    job_id: String,
}

async fn enqueue_localization_job(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<LocalizationRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    crate::metrics::inc_requests("/jobs/localizations");
    let id = state
        .queue
        .enqueue_localization(payload, Some(context))
        .await
        .map_err(|err| PipelineError::internal("enqueue", err.error))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            job_id: id.to_string(),
        }),
    ))
}

async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<jobs::JobInfo>, AppError> {
    let Ok(uuid) = uuid::Uuid::parse_str(&id) else {
        return Err(PipelineError::invalid_input("jobs", "invalid_job_id").into());
    };
    state
        .queue
        .get(uuid)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(ApiError::new("jobs", "not_found")))
}

/// Serialize a result set into a downloadable file.
///
/// - Method: `POST`
/// - Path: `/exports`
/// - Body: `{ results, format: { format: <tag>, ...context } }`
/// - Response: file bytes with `Content-Type` and `Content-Disposition`
async fn create_export(Json(payload): Json<ExportRequest>) -> Result<Response, AppError> {
    crate::metrics::inc_requests("/exports");
    let artifact = export::export(&payload.results, &payload.format).map_err(export_error)?;
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        artifact.filename.replace('"', ""),
        urlencoding::encode(&artifact.filename)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(artifact.mime)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}

fn export_error(err: ExportError) -> PipelineError {
    match err {
        ExportError::MissingRawRows
        | ExportError::MissingSourceRow(_)
        | ExportError::UnknownMarketplace(_) => PipelineError::invalid_input("export", err.to_string()),
        ExportError::Csv(_) | ExportError::Buffer(_) | ExportError::Workbook(_) => {
            PipelineError::internal("export", err.to_string())
        }
    }
}

#[derive(Debug)]
enum AppError {
    Pipeline(PipelineError),
    NotFound(ApiError),
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Pipeline(err) => {
                let status = match err.kind() {
                    PipelineErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                    PipelineErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    error!(target = "hermes.api", stage = err.stage(), error = %err, "request failed");
                }
                let payload = ApiError::new(err.stage(), err.detail());
                (status, Json(payload)).into_response()
            }
            AppError::NotFound(payload) => (StatusCode::NOT_FOUND, Json(payload)).into_response(),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde_json::Value;
    use std::collections::HashMap;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "test-key";
    const CSV: &str = "SKU,Title,Description\nA1,Brass lamp,A warm brass desk lamp\n";

    fn app(gateway_url: &str) -> Router {
        let env = HashMap::from([
            ("TENSORZERO_GATEWAY_URL", gateway_url.to_string()),
            ("API_KEYS", format!("acme:{KEY}")),
        ]);
        let config = AppConfig::from_lookup(|key| env.get(key).cloned());
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let auth = AuthState::from_keys(config.api_keys.as_deref());
        build_router(AppState::new(config, handle), auth)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("X-Hermes-Key", KEY)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_authed(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {KEY}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn upload_body() -> Value {
        json!({"filename": "catalog.csv", "content_base64": STANDARD.encode(CSV)})
    }

    async fn gateway() -> MockServer {
        let server = MockServer::start().await;
        let listing = json!({
            "title": "Messing-Schreibtischlampe",
            "description": "Eine warme Schreibtischlampe aus Messing",
            "bullet_points": ["a", "b", "c", "d", "e"],
            "keywords": ["messinglampe", "schreibtischlampe"],
            "seo_meta_title": "Lampe",
            "seo_meta_description": "Lampe aus Messing"
        });
        Mock::given(method("POST"))
            .and(path("/inference"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": format!("```json\n{listing}\n```")}],
                "usage": {"input_tokens": 900, "output_tokens": 120}
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn health_and_marketplaces_are_public() {
        let app = app("http://127.0.0.1:9");
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/marketplaces").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let list = body_json(response).await;
        assert!(list.as_array().unwrap().iter().any(|m| m["id"] == "amazon_de"));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/marketplaces/etsy_international").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["bullet_point_count"], 0);

        let response = app
            .oneshot(Request::builder().uri("/marketplaces/amazon_mars").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = app("http://127.0.0.1:9")
            .oneshot(Request::builder().uri("/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"]["/localizations"].is_object());
    }

    #[tokio::test]
    async fn protected_routes_require_key() {
        let response = app("http://127.0.0.1:9")
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/uploads/inspect")
                    .header("content-type", "application/json")
                    .body(Body::from(upload_body().to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "missing_api_key");
    }

    #[tokio::test]
    async fn inspect_then_save_mapping() {
        let app = app("http://127.0.0.1:9");
        let response = app
            .clone()
            .oneshot(post_json("/uploads/inspect", upload_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let inspected = body_json(response).await;
        assert_eq!(inspected["format"], "csv");
        assert_eq!(inspected["row_count"], 1);
        assert_eq!(inspected["suggested_mappings"][1]["target_field"], "title");
        assert!(inspected.get("saved_mappings").is_none());
        let fingerprint = inspected["fingerprint"].as_str().unwrap().to_string();

        let mut put = post_json(
            &format!("/mappings/{fingerprint}"),
            json!({"mappings": [
                {"source_column": "Title", "target_field": "title"},
                {"source_column": "SKU", "target_field": "doNotTranslate"}
            ]}),
        );
        *put.method_mut() = axum::http::Method::PUT;
        let response = app.clone().oneshot(put).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_authed(&format!("/mappings/{fingerprint}")))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["mappings"][1]["target_field"], "doNotTranslate");

        let response = app
            .oneshot(post_json("/uploads/inspect", upload_body()))
            .await
            .unwrap();
        let inspected = body_json(response).await;
        assert_eq!(inspected["saved_mappings"][0]["source_column"], "Title");
    }

    #[tokio::test]
    async fn invalid_mapping_is_rejected() {
        let mut put = post_json(
            "/mappings/abc",
            json!({"mappings": [{"source_column": "Body", "target_field": "description"}]}),
        );
        *put.method_mut() = axum::http::Method::PUT;
        let response = app("http://127.0.0.1:9").oneshot(put).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "mappings");
    }

    #[tokio::test]
    async fn localization_runs_and_replays_idempotently() {
        let server = gateway().await;
        let app = app(&server.uri());
        let body = json!({
            "source": upload_body(),
            "marketplace": "amazon_de",
            "target_language": "de"
        });

        let mut request = post_json("/localizations", body.clone());
        request
            .headers_mut()
            .insert("Idempotency-Key", HeaderValue::from_static("run-1"));
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let first = body_json(response).await;
        assert_eq!(first["account_id"], "acme");
        assert_eq!(first["results"][0]["localized"]["title"], "Messing-Schreibtischlampe");
        assert_eq!(
            first["results"][0]["localized"]["keywords"],
            "messinglampe, schreibtischlampe"
        );
        assert_eq!(first["usage"]["input_tokens"], 900);
        assert_eq!(first["quality"]["total_listings"], 1);
        assert_eq!(first["stages"].as_array().unwrap().len(), 5);

        let mut replay = post_json("/localizations", body);
        replay
            .headers_mut()
            .insert("Idempotency-Key", HeaderValue::from_static("run-1"));
        let second = body_json(app.oneshot(replay).await.unwrap()).await;
        assert_eq!(second["job_id"], first["job_id"]);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_marketplace_is_bad_request() {
        let response = app("http://127.0.0.1:9")
            .oneshot(post_json(
                "/localizations",
                json!({"source": upload_body(), "marketplace": "amazon_mars", "target_language": "de"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = body_json(response).await;
        assert_eq!(error["error"], "marketplace");
    }

    #[tokio::test]
    async fn queued_job_completes() {
        let server = gateway().await;
        let app = app(&server.uri());
        let response = app
            .clone()
            .oneshot(post_json(
                "/jobs/localizations",
                json!({"source": upload_body(), "marketplace": "shopify", "target_language": "fr"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let job_id = body_json(response).await["job_id"].as_str().unwrap().to_string();

        let mut state = Value::Null;
        for _ in 0..200 {
            let response = app
                .clone()
                .oneshot(get_authed(&format!("/jobs/{job_id}")))
                .await
                .unwrap();
            state = body_json(response).await;
            if state["state"] == "completed" {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(state["state"], "completed");
        assert_eq!(state["result"]["marketplace"], "shopify");

        let response = app.oneshot(get_authed("/jobs/not-a-uuid")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn export_returns_attachment() {
        let results = json!([{
            "source_row": 0,
            "original": {"title": "Widget, \"Pro\"", "description": "d", "source_row": 0},
            "localized": {"title": "Widget, \"Pro\"", "description": "Beschreibung"},
            "quality_flags": []
        }]);
        let response = app("http://127.0.0.1:9")
            .oneshot(post_json(
                "/exports",
                json!({"results": results, "format": {"format": "generic_csv"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"localized_listings.csv\""));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("\"Widget, \"\"Pro\"\"\""));
    }

    #[tokio::test]
    async fn localized_upload_exports_as_flat_file() {
        let server = gateway().await;
        let app = app(&server.uri());
        let tsv = "sku\titem_name\tbullet_point1\tsearch_terms\nA1\tBrass lamp\tWarm light\tbrass\n";
        let response = app
            .clone()
            .oneshot(post_json(
                "/localizations",
                json!({
                    "source": {"filename": "flat.txt", "content_base64": STANDARD.encode(tsv)},
                    "marketplace": "amazon_de",
                    "target_language": "de"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let localized = body_json(response).await;
        assert_eq!(localized["raw_table"]["rows"][0]["sku"], "A1");

        let response = app
            .oneshot(post_json(
                "/exports",
                json!({
                    "results": localized["results"],
                    "format": {"format": "amazon_flat_file", "raw_table": localized["raw_table"]}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/tab-separated-values; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let mut lines = text.lines();
        assert!(
            lines
                .next()
                .unwrap()
                .starts_with("sku\titem_name\tbullet_point1\tsearch_terms\t")
        );
        assert!(
            lines
                .next()
                .unwrap()
                .starts_with("A1\tMessing-Schreibtischlampe\ta\tbrass\t")
        );
    }

    #[tokio::test]
    async fn flat_file_export_needs_matching_rows() {
        let results = json!([{
            "source_row": 3,
            "original": {"title": "Lamp", "source_row": 3},
            "localized": {"title": "Lampe"},
            "quality_flags": []
        }]);
        let response = app("http://127.0.0.1:9")
            .oneshot(post_json(
                "/exports",
                json!({
                    "results": results,
                    "format": {"format": "amazon_flat_file", "raw_table": {"headers": ["item_name"], "rows": [{"item_name": "Lamp"}]}}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = body_json(response).await;
        assert_eq!(error["error"], "export");
        assert!(error["detail"].as_str().unwrap().contains("row 3"));
    }
}
