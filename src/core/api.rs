//! HTTP API for Codex7
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /verify - Verify one text
//! - POST /verify/batch - Verify many independent texts
//! - POST /check - Check a token sequence against the canon
//! - POST /session/new - Create session
//! - POST /session/{id}/verify - Verify through the session's kernel
//! - GET /session/{id} - Session status
//! - DELETE /session/{id} - Drop a session
//!
//! Verification is CPU-bound and runs on the blocking pool. Idle sessions
//! expire, and the least recently used one is evicted at capacity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::core::canon::CANON;
use crate::core::tokens::{parse_json_values, parse_tokens};
use crate::core::verify::{Session, Verifier};
use crate::types::{
    BatchReport, CheckReport, CodexError, Phase, ThermodynamicState, VerificationResult, VerifyConfig,
};
use crate::{API_MAX_BATCH_TEXTS, API_MAX_BODY_BYTES, API_MAX_SESSIONS, API_SESSION_IDLE_TTL_SECS};

/// Keys dropped from a result when the caller opts out of kernel output
const KERNEL_KEYS: [&str; 4] = ["thermodynamic_state", "dominant_operator", "regime", "lawfulness"];

/// Request and session bounds of the server
#[derive(Debug, Clone, Copy)]
pub struct ApiLimits {
    pub max_body_bytes: usize,
    pub max_batch_texts: usize,
    pub max_sessions: usize,
    pub session_idle_ttl: Duration,
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: API_MAX_BODY_BYTES,
            max_batch_texts: API_MAX_BATCH_TEXTS,
            max_sessions: API_MAX_SESSIONS,
            session_idle_ttl: Duration::from_secs(API_SESSION_IDLE_TTL_SECS),
        }
    }
}

/// A session and the verifier it was opened with
#[derive(Debug)]
pub struct SessionEntry {
    pub verifier: Verifier,
    pub session: Session,
    pub last_used: Instant,
}

type SessionMap = HashMap<String, Arc<Mutex<SessionEntry>>>;

/// App state
pub struct AppState {
    pub config: VerifyConfig,
    pub limits: ApiLimits,
    pub sessions: RwLock<SessionMap>,
}

/// Verify request
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub text: String,
    pub threshold: Option<String>,
    #[serde(rename = "includeKernel", default = "default_include_kernel")]
    pub include_kernel: bool,
}

fn default_include_kernel() -> bool {
    true
}

/// Batch request
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub texts: Vec<String>,
    pub threshold: Option<String>,
}

/// Check request; `sequence` is a JSON array or a string of symbols/names
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub sequence: Value,
}

/// Create new session request
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    pub threshold: Option<String>,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub threshold_phase: Phase,
    pub created_at: DateTime<Utc>,
}

/// Session verify request
#[derive(Debug, Deserialize)]
pub struct SessionVerifyRequest {
    pub text: String,
    #[serde(rename = "includeKernel", default = "default_include_kernel")]
    pub include_kernel: bool,
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub threshold_phase: Phase,
    pub verifications: usize,
    pub thermodynamic_state: ThermodynamicState,
    pub created_at: DateTime<Utc>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub canon_version: String,
    pub sessions_active: usize,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

impl From<CodexError> for ApiError {
    fn from(err: CodexError) -> Self {
        api_error(StatusCode::BAD_REQUEST, err.to_string())
    }
}

/// Create the API router with default configuration
pub fn create_router() -> Router {
    create_router_with_config(VerifyConfig::default())
}

/// Create the API router with default limits
pub fn create_router_with_config(config: VerifyConfig) -> Router {
    create_router_with_limits(config, ApiLimits::default())
}

/// Create the API router
pub fn create_router_with_limits(config: VerifyConfig, limits: ApiLimits) -> Router {
    let state = Arc::new(AppState {
        config,
        limits,
        sessions: RwLock::new(HashMap::new()),
    });

    Router::new()
        .route("/health", get(health))
        .route("/verify", post(verify))
        .route("/verify/batch", post(verify_batch))
        .route("/check", post(check))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session).delete(delete_session))
        .route("/session/:id/verify", post(session_verify))
        .layer(DefaultBodyLimit::max(limits.max_body_bytes))
        .with_state(state)
}

/// Verifier for a request, honouring an optional threshold override
fn verifier_for(config: &VerifyConfig, threshold: Option<&str>) -> Result<Verifier, ApiError> {
    let config = match threshold {
        Some(name) => config.with_threshold(Phase::from_name(name)?),
        None => *config,
    };
    Ok(Verifier::new(config))
}

/// Run CPU-bound verification off the async workers
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        warn!(error = %e, "verification task failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "verification task failed")
    })
}

/// Result as JSON, without the kernel keys unless requested
fn result_body(result: &VerificationResult, include_kernel: bool) -> Result<Value, ApiError> {
    let mut body = serde_json::to_value(result)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if !include_kernel {
        if let Value::Object(map) = &mut body {
            for key in KERNEL_KEYS {
                map.remove(key);
            }
        }
    }
    Ok(body)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        canon_version: CANON.version().to_string(),
        sessions_active: sessions.len(),
    })
}

/// Verify one text in a fresh session
async fn verify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.text.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "text must not be empty"));
    }
    let verifier = verifier_for(&state.config, req.threshold.as_deref())?;
    let text = req.text;
    let result = run_blocking(move || verifier.verify(&text)).await?;
    Ok(Json(result_body(&result, req.include_kernel)?))
}

/// Verify independent texts
async fn verify_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchReport>, ApiError> {
    if req.texts.len() > state.limits.max_batch_texts {
        return Err(api_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "batch of {} texts exceeds the limit of {}",
                req.texts.len(),
                state.limits.max_batch_texts
            ),
        ));
    }
    let verifier = verifier_for(&state.config, req.threshold.as_deref())?;
    let texts = req.texts;
    let report = run_blocking(move || verifier.batch(&texts)).await?;
    Ok(Json(report))
}

/// Check a token sequence
async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckReport>, ApiError> {
    let parsed = match &req.sequence {
        Value::Array(values) => parse_json_values(values, &CANON),
        Value::String(content) => parse_tokens(content, &CANON)?,
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "sequence must be an array or a string",
            ))
        }
    };
    let verifier = Verifier::new(state.config);
    let report = run_blocking(move || verifier.check_sequence(&parsed)).await?;
    if !report.is_valid {
        warn!(violations = report.gray_events.len(), "sequence failed canon check");
    }
    Ok(Json(report))
}

/// Create new session
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSessionRequest>,
) -> Result<Json<NewSessionResponse>, ApiError> {
    let verifier = verifier_for(&state.config, req.threshold.as_deref())?;
    let session = verifier.new_session();
    let session_id = generate_session_id();
    let entry = SessionEntry { verifier, session, last_used: Instant::now() };

    let response = NewSessionResponse {
        session_id: session_id.clone(),
        threshold_phase: entry.verifier.config().threshold,
        created_at: entry.session.created_at(),
    };

    let mut sessions = state.sessions.write().await;
    evict_sessions(&mut sessions, &state.limits);
    if sessions.len() >= state.limits.max_sessions {
        return Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "session capacity reached"));
    }
    sessions.insert(session_id.clone(), Arc::new(Mutex::new(entry)));
    info!(session_id = %session_id, active = sessions.len(), "session created");

    Ok(Json(response))
}

/// Drop idle sessions, then the least recently used ones until there is room
///
/// Sessions locked by an in-flight request are in use and never evicted.
fn evict_sessions(sessions: &mut SessionMap, limits: &ApiLimits) {
    sessions.retain(|id, entry| match entry.try_lock() {
        Ok(entry) if entry.last_used.elapsed() > limits.session_idle_ttl => {
            debug!(session_id = %id, "session expired");
            false
        }
        _ => true,
    });

    while sessions.len() >= limits.max_sessions {
        let oldest = sessions
            .iter()
            .filter_map(|(id, entry)| entry.try_lock().ok().map(|e| (id.clone(), e.last_used)))
            .min_by_key(|(_, last_used)| *last_used)
            .map(|(id, _)| id);
        match oldest {
            Some(id) => {
                sessions.remove(&id);
                info!(session_id = %id, "session evicted at capacity");
            }
            None => break,
        }
    }
}

async fn lookup(state: &AppState, id: &str) -> Result<Arc<Mutex<SessionEntry>>, ApiError> {
    let sessions = state.sessions.read().await;
    sessions
        .get(id)
        .cloned()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("no session '{}'", id)))
}

/// Get session status
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let entry = lookup(&state, &id).await?;
    let mut entry = entry.lock().await;
    entry.last_used = Instant::now();

    Ok(Json(SessionStatusResponse {
        session_id: id,
        threshold_phase: entry.verifier.config().threshold,
        verifications: entry.session.verifications(),
        thermodynamic_state: *entry.session.state(),
        created_at: entry.session.created_at(),
    }))
}

/// Verify through a session's kernel
async fn session_verify(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SessionVerifyRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.text.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "text must not be empty"));
    }
    let entry = lookup(&state, &id).await?;
    let mut entry = entry.lock_owned().await;
    let text = req.text;
    let result = run_blocking(move || {
        entry.last_used = Instant::now();
        let SessionEntry { verifier, session, .. } = &mut *entry;
        verifier.verify_in(session, &text)
    })
    .await?;
    Ok(Json(result_body(&result, req.include_kernel)?))
}

/// Drop a session
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut sessions = state.sessions.write().await;
    match sessions.remove(&id) {
        Some(_) => {
            info!(session_id = %id, "session deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(api_error(StatusCode::NOT_FOUND, format!("no session '{}'", id))),
    }
}

/// Generate session ID
fn generate_session_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("session_{:x}_{:x}", nanos, n)
}

/// Run the API server
pub async fn run_server(addr: &str, config: VerifyConfig) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router_with_config(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, threshold = %config.threshold, "Codex7 API listening");
    axum::serve(listener, router).await?;
    Ok(())
}
