//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::store::roster::ROSTER_CHUNK;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

type HmacSha256 = Hmac<Sha256>;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health_handler))
        .route("/session", post(create_session_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    active_members: usize,
    cached_rosters: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.session_registry.active_sessions(),
        active_members: state.session_registry.total_members(),
        cached_rosters: state.roster_store.cached_count(),
    })
}

// ============================================================================
// Session bootstrap endpoint
// ============================================================================

#[derive(Serialize)]
struct CreateSessionResponse {
    /// Session credential to present on the WebSocket upgrade
    session: String,
    /// Client URL preloaded with the credential
    iframe: String,
}

/// Exchange a wallet signature for a session credential.
///
/// The credential is hex(HMAC-SHA256(key = signature, msg = fresh UUID));
/// the caller's characters are fetched from the birds API and cached under
/// it for the join to pick up.
async fn create_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let signature = headers
        .get("signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if signature.len() < 100 {
        warn!(signature_len = signature.len(), "Invalid signature");
        return Err(AppError::BadRequest("Invalid signature".to_string()));
    }

    let nonce = Uuid::new_v4();
    let mut mac = HmacSha256::new_from_slice(signature.as_bytes())
        .map_err(|_| AppError::Internal("HMAC initialization failed".to_string()))?;
    mac.update(nonce.to_string().as_bytes());
    let session = hex::encode(mac.finalize().into_bytes());

    let birds = state
        .birds_api
        .fetch_birds(signature)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let cached = state.roster_store.cache_roster(&session, birds, ROSTER_CHUNK);

    info!(session = %session, cached, "New session credential");

    let origin = state
        .config
        .client_origin
        .split(',')
        .next()
        .unwrap_or_default()
        .trim();

    Ok(Json(CreateSessionResponse {
        iframe: format!("{}/?session={}&uuid={}", origin, session, nonce),
        session,
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
