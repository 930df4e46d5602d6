//! OCR Gateway - HTTP front-end for a Tesseract OCR engine.
//!
//! Accepts an image or PDF (multipart upload or URL), splits PDFs into
//! page images, runs the selected pages through the engine and returns
//! text, coordinates and confidence as JSON.

mod aggregate;
mod config;
mod document;
mod engine;
mod error;
mod fetch;
mod pages;
mod schema;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use config::Settings;
use engine::EngineCache;
use error::OcrError;
use schema::{Health, LanguageInfo, OcrResponse, ResponseOptions, ServiceInfo};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
    engines: Arc<EngineCache>,
    http: reqwest::Client,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocr_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    info!("Settings: {:?}", settings);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.download_timeout_secs))
        .build()?;

    let max_upload_bytes = settings.max_upload_bytes;
    let bind_addr = settings.bind_addr.clone();

    let state = AppState {
        engines: Arc::new(EngineCache::new(settings.tessdata_dir.clone())),
        settings: Arc::new(settings),
        http,
    };

    let app = Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/languages", get(languages))
        .route("/ocr", post(run_ocr))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Service metadata.
async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        features: vec![
            "image",
            "pdf",
            "url_fetch",
            "page_selection",
            "multi_language",
            "auto_rotate",
        ],
    })
}

/// Health check with engine-cache visibility.
async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: unix_timestamp(),
        ocr_instances_loaded: state.engines.loaded_count(),
    })
}

/// Supported language codes and display names.
async fn languages() -> Json<Vec<LanguageInfo>> {
    Json(
        engine::SUPPORTED_LANGUAGES
            .iter()
            .map(|l| LanguageInfo {
                code: l.code,
                name: l.name,
            })
            .collect(),
    )
}

/// Run OCR over an uploaded or downloaded document.
async fn run_ocr(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OcrResponse>, OcrError> {
    let started = Instant::now();
    let form = OcrForm::from_multipart(multipart).await?;

    let language = engine::resolve_language(&form.language)?;
    if form.enhance_quality {
        tracing::debug!("enhance_quality requested; accepted but not applied");
    }

    let bytes = match resolve_source(form.file, form.file_url)? {
        ByteSource::Upload(bytes) => bytes,
        ByteSource::Remote(url) => {
            fetch::download(&state.http, &url, state.settings.max_upload_bytes).await?
        }
    };
    let file_size = bytes.len();

    let request_id = form.request_id.unwrap_or_else(generate_request_id);
    let max_pages = form.max_pages.unwrap_or(state.settings.default_max_pages);
    let pages_expr = form.pages;
    let auto_rotate = form.auto_rotate;
    let engines = Arc::clone(&state.engines);

    // Staging area lives for exactly this request; the TempDir guard
    // removes every staged artifact on all exit paths.
    let staging = tempfile::tempdir()
        .map_err(|e| OcrError::Unexpected(anyhow::anyhow!("staging dir failed: {}", e)))?;
    let staging_path = staging.path().to_path_buf();

    let document = tokio::task::spawn_blocking(move || {
        let loaded = document::load(&bytes)?;
        let selected = pages::select(&pages_expr, loaded.pages.len() as u32, max_pages)?;
        if selected.len() as u32 > max_pages {
            return Err(OcrError::PageLimitExceeded(format!(
                "selection of {} pages exceeds the cap of {}",
                selected.len(),
                max_pages
            )));
        }
        aggregate::aggregate(
            engines.as_ref(),
            &loaded,
            &selected,
            language,
            auto_rotate,
            &staging_path,
        )
    })
    .await
    .map_err(|e| OcrError::Unexpected(anyhow::anyhow!("pipeline task failed: {}", e)))??;

    drop(staging);

    let metadata = form.include_metadata.then(|| {
        serde_json::json!({
            "document_type": document.kind.as_str(),
            "total_pages": document.total_pages,
            "language": language.code,
            "auto_rotate": auto_rotate,
            "file_size_bytes": file_size,
        })
    });

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        "request {}: {} of {} pages in {}ms (avg confidence {:.3})",
        request_id,
        document.pages.len(),
        document.total_pages,
        elapsed_ms,
        document.average_confidence
    );

    Ok(Json(OcrResponse::shape(
        &document,
        ResponseOptions {
            include_confidence: form.include_confidence,
            include_coordinates: form.include_coordinates,
        },
        request_id,
        elapsed_ms,
        metadata,
    )))
}

// ============================================================================
// Multipart form
// ============================================================================

/// Recognized `POST /ocr` form fields with their defaults.
struct OcrForm {
    file: Option<Vec<u8>>,
    file_url: Option<String>,
    language: String,
    pages: String,
    max_pages: Option<u32>,
    include_confidence: bool,
    include_coordinates: bool,
    include_metadata: bool,
    auto_rotate: bool,
    enhance_quality: bool,
    request_id: Option<String>,
}

impl Default for OcrForm {
    fn default() -> Self {
        Self {
            file: None,
            file_url: None,
            language: "en".to_string(),
            pages: "all".to_string(),
            max_pages: None,
            include_confidence: true,
            include_coordinates: false,
            include_metadata: false,
            auto_rotate: true,
            enhance_quality: false,
            request_id: None,
        }
    }
}

impl OcrForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, OcrError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| OcrError::InvalidInput(format!("multipart error: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "file" => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| OcrError::InvalidInput(format!("failed to read file: {}", e)))?;
                    if !bytes.is_empty() {
                        form.file = Some(bytes.to_vec());
                    }
                }
                other => {
                    let value = field.text().await.map_err(|e| {
                        OcrError::InvalidInput(format!("failed to read field {}: {}", other, e))
                    })?;
                    let value = value.trim().to_string();
                    if value.is_empty() {
                        continue;
                    }
                    match other {
                        "file_url" => form.file_url = Some(value),
                        "language" => form.language = value,
                        "pages" => form.pages = value,
                        "max_pages" => {
                            form.max_pages = Some(value.parse().map_err(|_| {
                                OcrError::InvalidInput(format!("invalid max_pages: {}", value))
                            })?)
                        }
                        "include_confidence" => form.include_confidence = parse_bool(&value),
                        "include_coordinates" => form.include_coordinates = parse_bool(&value),
                        "include_metadata" => form.include_metadata = parse_bool(&value),
                        "auto_rotate" => form.auto_rotate = parse_bool(&value),
                        "enhance_quality" => form.enhance_quality = parse_bool(&value),
                        "request_id" => form.request_id = Some(value),
                        _ => {}
                    }
                }
            }
        }

        Ok(form)
    }
}

/// Where the document bytes come from.
#[derive(Debug)]
enum ByteSource {
    Upload(Vec<u8>),
    Remote(String),
}

/// Exactly one source must yield bytes; when both are supplied the
/// upload takes precedence.
fn resolve_source(
    file: Option<Vec<u8>>,
    file_url: Option<String>,
) -> Result<ByteSource, OcrError> {
    match (file, file_url) {
        (Some(bytes), _) => Ok(ByteSource::Upload(bytes)),
        (None, Some(url)) => Ok(ByteSource::Remote(url)),
        (None, None) => Err(OcrError::InvalidInput(
            "please provide either a file upload or a file_url".into(),
        )),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

// ============================================================================
// Helper functions
// ============================================================================

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Correlation id for callers that did not supply one: a time-based hash,
/// 12 hex chars with a `req_` prefix.
fn generate_request_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let digest = Sha256::digest(nanos.to_be_bytes());
    let hex: String = digest[..6].iter().map(|b| format!("{:02x}", b)).collect();
    format!("req_{}", hex)
}
