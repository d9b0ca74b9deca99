//! HTTP polling API in front of the broker, the retrieval engine and the knowledge folder

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use recrutime_retriever::retrieval::{
    chunking_strategy::ChunkingStrategy, knowledge_base::KnowledgeBase,
    term_index::DEFAULT_TOP_K,
};
use recrutime_retriever::{RetrievalError, SearchEngine, SearchResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::broker::{InterviewBroker, InterviewReport, QuestionPoll, SessionStatus};
use crate::candidate::BrokerChannel;
use crate::config::ServerConfig;
use crate::error::{BrokerError, StoreError};
use crate::handoff::{HandoffDocument, HandoffStore};
use crate::interviewer::{InterviewPlan, OfferProfile, ScriptedInterviewer};
use crate::job_config::{JobConfig, JobConfigStore};
use crate::worker::spawn_interview;

pub const SERVICE_NAME: &str = "RecruTime Backend";

/// Application state shared across handlers
pub struct AppState {
    pub broker: Arc<InterviewBroker>,
    pub engine: Arc<SearchEngine>,
    pub knowledge: KnowledgeBase,
    pub handoff: Option<HandoffStore>,
    pub job_config: JobConfigStore,
    pub plan: InterviewPlan,
    pub answer_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let index_config = config.index_config();
        let knowledge = KnowledgeBase::new(
            config.knowledge_dir.clone(),
            ChunkingStrategy::new(index_config.chunking_config.clone()),
        );

        let handoff = match &config.handoff_path {
            Some(path) => Some(
                HandoffStore::open(path)
                    .with_context(|| format!("Failed to open handoff store {}", path.display()))?,
            ),
            None => None,
        };

        let job_config = match &config.job_config_path {
            Some(path) => JobConfigStore::load(path),
            None => JobConfigStore::in_memory(),
        };

        Ok(Self {
            broker: Arc::new(InterviewBroker::new()),
            engine: Arc::new(SearchEngine::new(index_config)),
            knowledge,
            handoff,
            job_config,
            plan: config.plan.clone(),
            answer_timeout: config.answer_timeout,
        })
    }
}

type AppStateArc = Arc<AppState>;

/// Build the API router. CORS is layered on by [`run_server`].
pub fn router(state: AppStateArc) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(interview_routes())
        .merge(search_routes())
        .merge(knowledge_routes())
        .merge(job_config_routes())
        .merge(handoff_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until it fails.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(&config)?);

    let origin: HeaderValue = config
        .frontend_origin
        .parse()
        .with_context(|| format!("Invalid frontend origin {:?}", config.frontend_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let app = router(state).layer(cors);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Knowledge folder: {}", config.knowledge_dir.display());

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

/// Error response rendered as `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::NotFound { .. } => Self::not_found("Session not found"),
            BrokerError::InvalidTransition { .. } => Self::bad_request(err.to_string()),
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::UnsupportedExtension { .. } | RetrievalError::InvalidName { .. } => {
                Self::bad_request(err.to_string())
            }
            RetrievalError::DocumentNotFound { .. } => Self::not_found(err.to_string()),
            RetrievalError::Io { .. } => Self::internal(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal(err.to_string())
    }
}

// Filesystem and index work stays off the async worker threads
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("Background task failed: {e}")))
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

// ============================================================================
// Interview Routes
// ============================================================================

fn interview_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/interview/start", post(start_interview))
        .route("/api/interview/sessions", get(list_sessions))
        .route("/api/interview/:id/question", get(get_question))
        .route("/api/interview/:id/answer", post(post_answer))
        .route("/api/interview/:id/report", get(get_report))
        .route("/api/interview/:id/status", get(get_status))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartRequest {
    /// Blank falls back to the job config title, then to the plan's role
    pub role_title: String,
    pub candidate_name: Option<String>,
    pub questions: Option<Vec<String>>,
    pub offer_experience_level: Option<String>,
    pub offer_tech_skills: Option<Vec<String>>,
    pub offer_education: Option<String>,
    pub offer_soft_skills: Option<Vec<String>>,
}

impl StartRequest {
    fn offer(&self) -> OfferProfile {
        OfferProfile {
            experience_level: self.offer_experience_level.clone(),
            tech_skills: self.offer_tech_skills.clone().unwrap_or_default(),
            education: self.offer_education.clone(),
            soft_skills: self.offer_soft_skills.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

async fn start_interview(
    State(state): State<AppStateArc>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let job = state.job_config.get();
    let offer = req.offer();
    let role_title = if req.role_title.trim().is_empty() {
        job.title.clone()
    } else {
        req.role_title
    };
    let plan = state
        .plan
        .for_request(&role_title, req.candidate_name, req.questions)
        .with_job(job)
        .with_offer(offer);
    let session_id = state.broker.create_session();
    info!(
        "Starting interview {} for {} at {}",
        session_id,
        plan.role_title,
        plan.company()
    );

    let interviewer = ScriptedInterviewer::new(plan).with_search_engine(Arc::clone(&state.engine));
    let job_broker = Arc::clone(&state.broker);
    let timeout = state.answer_timeout;

    let spawned = spawn_interview(
        Arc::clone(&state.broker),
        session_id.clone(),
        move |session_id| {
            let channel =
                BrokerChannel::new(job_broker, session_id.to_string()).with_timeout(timeout);
            interviewer.run(&channel).map(|transcript| {
                info!("Interview {} collected {} answers", session_id, transcript.len());
            })
        },
    );

    if let Err(e) = spawned {
        state
            .broker
            .mark_error(&session_id, &format!("failed to start worker: {e}"))?;
        return Err(ApiError::internal(format!("Failed to start interview: {e}")));
    }

    Ok(Json(StartResponse { session_id }))
}

async fn list_sessions(State(state): State<AppStateArc>) -> Json<Value> {
    let store = state.broker.store();
    Json(json!({ "count": store.len(), "sessions": store.ids() }))
}

async fn get_question(
    State(state): State<AppStateArc>,
    Path(session_id): Path<String>,
) -> Result<Json<QuestionPoll>, ApiError> {
    Ok(Json(state.broker.poll(&session_id)?))
}

async fn post_answer(
    State(state): State<AppStateArc>,
    Path(session_id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<Value>, ApiError> {
    // Dropped answers are still acknowledged; the broker logs them
    state.broker.answer(&session_id, &req.answer)?;
    Ok(Json(json!({ "ok": true })))
}

async fn get_report(
    State(state): State<AppStateArc>,
    Path(session_id): Path<String>,
) -> Result<Json<InterviewReport>, ApiError> {
    Ok(Json(state.broker.report(&session_id)?))
}

async fn get_status(
    State(state): State<AppStateArc>,
    Path(session_id): Path<String>,
) -> Json<SessionStatus> {
    Json(state.broker.status(&session_id))
}

// ============================================================================
// Search Routes
// ============================================================================

fn search_routes() -> Router<AppStateArc> {
    Router::new().route("/api/search", get(search))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub top_k: Option<usize>,
}

async fn search(
    State(state): State<AppStateArc>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let top_k = params.top_k.unwrap_or(DEFAULT_TOP_K);
    let engine = Arc::clone(&state.engine);
    let results = run_blocking(move || engine.search(&params.q, top_k)).await?;
    Ok(Json(results))
}

// ============================================================================
// Knowledge Routes
// ============================================================================

fn knowledge_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/admin/knowledge", get(list_knowledge).post(add_knowledge))
        .route("/api/admin/knowledge/:name", delete(remove_knowledge))
        .route("/api/admin/reindex", post(reindex))
}

#[derive(Debug, Deserialize)]
pub struct AddDocumentRequest {
    pub name: String,
    pub content: String,
}

async fn list_knowledge(State(state): State<AppStateArc>) -> Result<Json<Value>, ApiError> {
    let files = run_blocking(move || state.knowledge.list()).await??;
    Ok(Json(json!({ "files": files })))
}

async fn add_knowledge(
    State(state): State<AppStateArc>,
    Json(req): Json<AddDocumentRequest>,
) -> Result<Json<Value>, ApiError> {
    let saved = run_blocking(move || {
        let saved = state.knowledge.add(&req.name, &req.content)?;
        state.engine.rebuild();
        Ok::<_, RetrievalError>(saved)
    })
    .await??;

    info!("Knowledge document saved as {}", saved);
    Ok(Json(json!({ "saved": saved })))
}

async fn remove_knowledge(
    State(state): State<AppStateArc>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    run_blocking(move || {
        state.knowledge.remove(&name)?;
        state.engine.rebuild();
        Ok::<_, RetrievalError>(())
    })
    .await??;

    Ok(Json(json!({ "ok": true })))
}

async fn reindex(State(state): State<AppStateArc>) -> Result<Json<Value>, ApiError> {
    let index = run_blocking(move || state.engine.rebuild()).await?;
    Ok(Json(json!({ "ok": true, "chunks": index.stats().chunks })))
}

// ============================================================================
// Job Config Routes
// ============================================================================

fn job_config_routes() -> Router<AppStateArc> {
    Router::new().route(
        "/api/admin/job-config",
        get(get_job_config).put(put_job_config),
    )
}

async fn get_job_config(State(state): State<AppStateArc>) -> Json<JobConfig> {
    Json(state.job_config.get())
}

async fn put_job_config(
    State(state): State<AppStateArc>,
    Json(config): Json<JobConfig>,
) -> Result<Json<Value>, ApiError> {
    run_blocking(move || state.job_config.save(config)).await??;
    Ok(Json(json!({ "ok": true })))
}

// ============================================================================
// Handoff Routes
// ============================================================================

fn handoff_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/items", get(list_items))
        .route("/api/answer", post(answer_item))
}

#[derive(Debug, Deserialize)]
pub struct ItemAnswerRequest {
    pub id: String,
    pub answer: String,
}

async fn list_items(State(state): State<AppStateArc>) -> Result<Json<HandoffDocument>, ApiError> {
    let document = run_blocking(move || {
        let store = handoff_store(&state)?;
        Ok::<_, ApiError>(store.document()?)
    })
    .await??;
    Ok(Json(document))
}

async fn answer_item(
    State(state): State<AppStateArc>,
    Json(req): Json<ItemAnswerRequest>,
) -> Result<Json<Value>, ApiError> {
    let found = run_blocking(move || {
        let store = handoff_store(&state)?;
        Ok::<_, ApiError>(store.answer(&req.id, &req.answer)?)
    })
    .await??;
    Ok(Json(json!({ "ok": found })))
}

fn handoff_store(state: &AppState) -> Result<&HandoffStore, ApiError> {
    state
        .handoff
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Handoff store not configured"))
}
