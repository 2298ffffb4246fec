//! HTTP gateway over the [`Orchestrator`].
//!
//! Routes:
//! - `POST /api/generate`: one orchestrated generation
//! - `GET /api/health`: liveness
//! - `GET /api/providers`: configured providers per media kind
//! - `GET /api/sessions/:id/recent`: generations recorded for a session

use crate::config::{ServerConfig, SessionSettings};
use crate::error::MediaGateError;
use crate::generation::{
    AspectRatio, Generation, GenerationRequest, MediaKind, ProviderKind, Quality,
};
use crate::orchestrator::Orchestrator;
use crate::session::SessionStore;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Request header carrying the caller's session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// A generation remembered for a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentGeneration {
    /// Prompt as submitted.
    pub prompt: String,
    /// Image or video.
    #[serde(rename = "type")]
    pub media: MediaKind,
    /// Provider that produced the assets.
    pub provider: ProviderKind,
    /// Asset URLs.
    pub urls: Vec<String>,
    /// When the generation finished.
    pub created_at: DateTime<Utc>,
}

type RecentGenerations = VecDeque<RecentGeneration>;

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Orchestrator,
    sessions: Arc<SessionStore<RecentGenerations>>,
    recent_limit: usize,
}

impl AppState {
    /// Creates handler state with a fresh session store.
    pub fn new(orchestrator: Orchestrator, sessions: SessionSettings) -> Self {
        Self {
            orchestrator,
            sessions: Arc::new(SessionStore::new(sessions.capacity, sessions.ttl)),
            recent_limit: sessions.recent_limit.max(1),
        }
    }

    /// The orchestrator serving `/api/generate`.
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Per-session history.
    pub fn sessions(&self) -> &SessionStore<RecentGenerations> {
        &self.sessions
    }

    fn record(&self, session_id: &str, request: &GenerationRequest, generation: &Generation) {
        let entry = RecentGeneration {
            prompt: request.prompt.clone(),
            media: request.media,
            provider: generation.provider,
            urls: generation.results.iter().map(|r| r.url.clone()).collect(),
            created_at: Utc::now(),
        };
        let limit = self.recent_limit;
        self.sessions.update(session_id, |recent| {
            recent.push_front(entry);
            recent.truncate(limit);
        });
    }
}

/// Builds the router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static(SESSION_HEADER),
        ])
        .max_age(Duration::from_secs(86400));

    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/health", get(health))
        .route("/api/providers", get(providers))
        .route("/api/sessions/:id/recent", get(recent))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `config.bind` and serves until Ctrl-C.
pub async fn serve(config: ServerConfig, orchestrator: Orchestrator) -> std::io::Result<()> {
    let state = AppState::new(orchestrator, config.sessions);
    let purge = spawn_session_purge(state.sessions.clone(), config.sessions.ttl);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(addr = %listener.local_addr()?, "media gateway listening");

    let result = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    purge.cancel();
    result
}

fn spawn_session_purge(
    sessions: Arc<SessionStore<RecentGenerations>>,
    ttl: Duration,
) -> CancellationToken {
    let stop = CancellationToken::new();
    let token = stop.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ttl.max(Duration::from_secs(1)));
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = sessions.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, "purged expired sessions");
                    }
                }
            }
        }
    });
    stop
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

// Inbound body of POST /api/generate.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    model: Option<String>,
    prompt: Option<String>,
    #[serde(rename = "type")]
    media: Option<MediaKind>,
    duration: Option<f64>,
    quality: Option<Quality>,
    aspect_ratio: Option<String>,
    size: Option<String>,
    n: Option<f64>,
    fallback: Option<bool>,
}

impl GenerateBody {
    fn into_request(self) -> Result<GenerationRequest, ApiError> {
        let prompt = self
            .prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Prompt is required", None))?;

        let mut request = GenerationRequest::new(prompt, self.media.unwrap_or(MediaKind::Image));
        if let Some(model) = self.model.filter(|m| !m.trim().is_empty()) {
            request = request.with_model(model);
        }
        if let Some(duration) = self.duration {
            request = request.with_duration(whole_number(duration));
        }
        if let Some(quality) = self.quality {
            request = request.with_quality(quality);
        }
        if let Some(raw) = self.aspect_ratio {
            match AspectRatio::parse(&raw) {
                Some(ratio) => request = request.with_aspect_ratio(ratio),
                None => warn!(aspect_ratio = %raw, "unknown aspect ratio, using default"),
            }
        }
        if let Some(size) = self.size.filter(|s| !s.trim().is_empty()) {
            request = request.with_size(size);
        }
        if let Some(n) = self.n {
            request = request.with_count(whole_number(n).max(1));
        }
        if self.fallback == Some(false) {
            request = request.without_fallback();
        }
        Ok(request)
    }
}

// Adapters clamp to what each vendor supports; here any JSON number is accepted.
fn whole_number(value: f64) -> u32 {
    value.max(0.0).round() as u32
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    data: Vec<GeneratedItem>,
    response_time: u64,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct GeneratedItem {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    revised_prompt: Option<String>,
    metadata: ItemMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemMetadata {
    provider: ProviderKind,
    model: String,
    status: String,
    #[serde(rename = "type")]
    media: MediaKind,
    attempts: u32,
    providers_tried: Vec<ProviderKind>,
}

impl GenerateResponse {
    fn new(media: MediaKind, generation: Generation, elapsed: Duration) -> Self {
        let Generation {
            results,
            attempts,
            providers_tried,
            ..
        } = generation;

        let data = results
            .into_iter()
            .map(|result| GeneratedItem {
                url: result.url,
                revised_prompt: result.revised_prompt,
                metadata: ItemMetadata {
                    provider: result.provider,
                    model: result.model,
                    status: result.status,
                    media,
                    attempts,
                    providers_tried: providers_tried.clone(),
                },
            })
            .collect();

        Self {
            data,
            response_time: elapsed.as_millis() as u64,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error body `{error, details?}` with its status code.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<Value>,
}

impl ApiError {
    fn bad_request(error: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            details,
        }
    }
}

impl From<MediaGateError> for ApiError {
    fn from(err: MediaGateError) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let (error, details) = match &err {
            MediaGateError::InvalidRequest(message) => (message.clone(), None),
            MediaGateError::NoProviderConfigured { media } => {
                let mut vars: Vec<&str> = ProviderKind::ALL
                    .iter()
                    .filter(|kind| kind.media() == *media)
                    .map(|kind| kind.env_var())
                    .collect();
                vars.dedup();
                (
                    format!("No {media} generation provider is configured"),
                    Some(json!(format!("Set one of: {}", vars.join(", ")))),
                )
            }
            _ => (
                "Generation failed".to_string(),
                Some(json!({
                    "provider": err.provider(),
                    "message": err.to_string(),
                })),
            ),
        };

        Self {
            status,
            error,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.error });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        ApiError::bad_request("Invalid request body", Some(json!(rejection.body_text())))
    })?;
    let request = body.into_request()?;
    let start = Instant::now();

    // Dropping the handler (client went away) cancels in-flight polling.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let outcome = state
        .orchestrator
        .generate_with_cancel(&request, &cancel)
        .await;
    guard.disarm();

    let generation = outcome?;

    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(session_id) = session_id {
        state.record(session_id, &request, &generation);
    }

    Ok(Json(GenerateResponse::new(
        request.media,
        generation,
        start.elapsed(),
    )))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn providers(State(state): State<AppState>) -> Json<Value> {
    let credentials = state.orchestrator.credentials();
    Json(json!({
        "image": credentials.configured(MediaKind::Image),
        "video": credentials.configured(MediaKind::Video),
    }))
}

async fn recent(State(state): State<AppState>, Path(session_id): Path<String>) -> Json<Value> {
    let data: Vec<RecentGeneration> = state
        .sessions
        .get(&session_id)
        .map(Vec::from)
        .unwrap_or_default();
    Json(json!({ "sessionId": session_id, "data": data }))
}
