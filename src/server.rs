//! HTTP API over a program document.
//!
//! Provides REST endpoints for workouts, session logging and cycle
//! transitions, a WebSocket that tells clients to refetch after the document
//! changes, and optional static file serving for a frontend.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::completion::process_finished_session;
use crate::domain::{LiftType, WorkoutSession};
use crate::error::{EngineError, StoreError};
use crate::generator::generate_workout;
use crate::profile::TrainingProfile;
use crate::progression::{
    CycleProposal, ProgressionRules, confirm_cycle_transition, propose_cycle_transition_with,
};
use crate::report::{ProfileStatus, profile_statuses};
use crate::store::{ProgramDocument, save_document};

/// Message types for WebSocket broadcast.
#[derive(Clone, Debug)]
pub enum WsMessage {
    /// The document changed, either through the API or on disk.
    DocumentUpdated,
    /// Reloading the document from disk failed.
    Error(String),
}

/// Shared application state.
pub struct AppState {
    /// The loaded document; writes hold the lock across engine call and save.
    pub document: RwLock<ProgramDocument>,
    /// Path the document is saved to and reloaded from.
    pub file_path: PathBuf,
    pub rules: ProgressionRules,
    pub ws_broadcast: broadcast::Sender<WsMessage>,
}

impl AppState {
    pub fn new(document: ProgramDocument, file_path: PathBuf, rules: ProgressionRules) -> Self {
        let (ws_broadcast, _) = broadcast::channel(16);
        Self {
            document: RwLock::new(document),
            file_path,
            rules,
            ws_broadcast,
        }
    }

    /// Replaces the in-memory document and notifies WebSocket clients.
    pub async fn replace_document(&self, document: ProgramDocument) {
        *self.document.write().await = document;
        let _ = self.ws_broadcast.send(WsMessage::DocumentUpdated);
    }
}

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(EngineError::InvalidDomainValue { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Engine(EngineError::PremiumRequired(_)) => StatusCode::FORBIDDEN,
            ApiError::Store(StoreError::UnknownProfile(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// === JSON Request/Response Types ===

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub profile: TrainingProfile,
    pub newly_unlocked: Option<String>,
    pub new_one_rep_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    #[serde(default)]
    pub training_maxes: HashMap<LiftType, f64>,
    /// Defaults to the cycle after the profile's current one.
    pub next_cycle: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub profile: TrainingProfile,
    pub newly_unlocked: Option<String>,
}

// === Router Setup ===

pub fn create_router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let router = Router::new()
        .route("/api/profiles", get(get_profiles))
        .route("/api/profiles/{id}/workout/{lift}", get(get_workout))
        .route("/api/profiles/{id}/sessions", post(post_session))
        .route("/api/profiles/{id}/cycle", get(get_cycle).post(post_cycle))
        .route("/ws", get(ws_handler));

    let router = match static_dir {
        Some(dir) => {
            router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        None => router,
    };

    router.layer(CorsLayer::permissive()).with_state(state)
}

pub async fn run_server(
    state: Arc<AppState>,
    port: u16,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let app = create_router(state, static_dir);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("Server running at http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// === WebSocket Handler ===

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: Arc<AppState>) {
    log::info!("WebSocket client connected");

    let mut rx = state.ws_broadcast.subscribe();

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let text = match msg {
                    Ok(WsMessage::DocumentUpdated) => "reload".to_string(),
                    Ok(WsMessage::Error(err)) => format!("error:{}", err),
                    // Missed some messages; a reload covers them
                    Err(broadcast::error::RecvError::Lagged(_)) => "reload".to_string(),
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    log::info!("WebSocket client disconnected");
}

// === API Handlers ===

/// GET /api/profiles - Status of every profile in the document.
async fn get_profiles(State(state): State<Arc<AppState>>) -> Json<Vec<ProfileStatus>> {
    let document = state.document.read().await;
    let profiles: Vec<TrainingProfile> = document.profiles().cloned().collect();
    Json(profile_statuses(
        &profiles,
        &document.history,
        &state.rules,
        Utc::now(),
    ))
}

/// GET /api/profiles/{id}/workout/{lift} - Prescribed session for a lift.
async fn get_workout(
    State(state): State<Arc<AppState>>,
    Path((id, lift)): Path<(String, String)>,
) -> Result<Json<WorkoutSession>, ApiError> {
    let lift: LiftType = lift.parse()?;
    let document = state.document.read().await;
    let profile = document.find_profile(&id)?;
    profile.ensure_program_access()?;

    Ok(Json(generate_workout(profile, lift, &document.history)?))
}

/// POST /api/profiles/{id}/sessions - Logs a finished session.
async fn post_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(session): Json<WorkoutSession>,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut document = state.document.write().await;
    let profile = document.find_profile(&id)?.clone();

    let outcome = process_finished_session(&profile, &document.history, session);

    let mut next = document.clone();
    next.history = outcome.history;
    next.upsert_profile(outcome.profile.clone());
    save_document(&state.file_path, &next)?;
    *document = next;
    drop(document);

    log::info!("Logged session for profile {}", id);
    let _ = state.ws_broadcast.send(WsMessage::DocumentUpdated);

    Ok(Json(SessionResponse {
        profile: outcome.profile,
        newly_unlocked: outcome.newly_unlocked,
        new_one_rep_max: outcome.max_update.map(|u| u.estimated),
    }))
}

/// GET /api/profiles/{id}/cycle - Proposed training maxes for the next cycle.
async fn get_cycle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CycleProposal>, ApiError> {
    let document = state.document.read().await;
    let profile = document.find_profile(&id)?;
    Ok(Json(propose_cycle_transition_with(
        profile,
        &document.history,
        &state.rules,
    )))
}

/// POST /api/profiles/{id}/cycle - Confirms (possibly edited) training maxes.
async fn post_cycle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let mut document = state.document.write().await;
    let profile = document.find_profile(&id)?.clone();
    let next_cycle = request
        .next_cycle
        .unwrap_or(profile.current_cycle.saturating_add(1));

    let outcome = confirm_cycle_transition(
        &profile,
        &document.history,
        &request.training_maxes,
        next_cycle,
    )?;

    let mut next = document.clone();
    next.upsert_profile(outcome.profile.clone());
    save_document(&state.file_path, &next)?;
    *document = next;
    drop(document);

    let _ = state.ws_broadcast.send(WsMessage::DocumentUpdated);

    Ok(Json(TransitionResponse {
        profile: outcome.profile,
        newly_unlocked: outcome.newly_unlocked,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Program;
    use crate::store::load_document;
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn make_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let mut root = TrainingProfile::new("root");
        root.training_maxes.insert(LiftType::Squat, 300.0);
        root.training_maxes.insert(LiftType::BenchPress, 200.0);
        let mut premium = TrainingProfile::new("client-1");
        premium.selected_program = Program::Monolith;

        let mut document = ProgramDocument::new(root);
        document.clients.push(premium);

        let path = dir.path().join("program.json");
        save_document(&path, &document).unwrap();
        Arc::new(AppState::new(document, path, ProgressionRules::default()))
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = create_router(state.clone(), None)
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::from(EngineError::invalid("lift", "curl")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(EngineError::PremiumRequired(Program::Bbs)).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(StoreError::UnknownProfile("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::CannotWrite("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_list_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(&dir);

        let (status, body) = send(&state, get("/api/profiles")).await;
        assert_eq!(status, StatusCode::OK);
        let profiles = body.as_array().unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0]["profileId"], "root");
        assert_eq!(profiles[0]["nextLift"], "Overhead Press");
    }

    #[tokio::test]
    async fn test_get_workout() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(&dir);

        let (status, body) = send(&state, get("/api/profiles/root/workout/squat")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lift"], "Squat");
        assert_eq!(body["exercises"][0]["sets"][5]["weight"], 255.0);
    }

    #[tokio::test]
    async fn test_get_workout_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(&dir);

        let (status, _) = send(&state, get("/api/profiles/root/workout/curl")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&state, get("/api/profiles/nobody/workout/squat")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&state, get("/api/profiles/client-1/workout/squat")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("premium"));
    }

    #[tokio::test]
    async fn test_post_session_persists() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(&dir);

        let (_, workout) = send(&state, get("/api/profiles/root/workout/squat")).await;
        let mut session: WorkoutSession = serde_json::from_value(workout).unwrap();
        for set in session.exercises[0].sets.iter_mut() {
            set.completed = true;
        }

        let (status, body) = send(
            &state,
            post("/api/profiles/root/sessions", serde_json::to_value(&session).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["newlyUnlocked"], "squat_225");
        // 255 × (1 + 5/30) = 297.5 -> 298
        assert_eq!(body["newOneRepMax"], 298.0);

        let saved = load_document(&state.file_path).unwrap();
        assert_eq!(saved.history.len(), 1);
        assert_eq!(saved.profile.one_rep_max(LiftType::Squat), 298.0);
        assert_eq!(state.document.read().await.history.len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_proposal_and_confirm() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(&dir);

        let (status, body) = send(&state, get("/api/profiles/root/cycle")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["proposedTrainingMaxes"]["Squat"], 310.0);
        assert_eq!(body["proposedTrainingMaxes"]["Bench Press"], 205.0);

        let (status, body) = send(
            &state,
            post(
                "/api/profiles/root/cycle",
                serde_json::json!({ "trainingMaxes": { "Squat": 305.0 } }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile"]["currentCycle"], 2);
        assert_eq!(body["newlyUnlocked"], "cycle_complete");

        let saved = load_document(&state.file_path).unwrap();
        assert_eq!(saved.profile.training_max(LiftType::Squat), 305.0);
        assert_eq!(saved.profile.training_max(LiftType::BenchPress), 200.0);
    }

    #[tokio::test]
    async fn test_confirm_rejects_cycle_zero() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(&dir);

        let (status, _) = send(
            &state,
            post("/api/profiles/root/cycle", serde_json::json!({ "nextCycle": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
