use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::{self, Config};
use crate::constants::{
    CHAT_REQUEST_FAILED, DEFAULT_VIDEO_LIMIT, MESSAGE_REQUIRED, QUERY_REQUIRED,
    THUMBNAIL_PLACEHOLDER, YOUTUBE_API_ERROR,
};
use crate::error::{ApiError, GatewayError};
use crate::gemini::GeminiGateway;
use crate::orchestrator::Orchestrator;
use crate::youtube::YouTubeGateway;

// The YouTube search API rejects maxResults above this.
const MAX_VIDEO_LIMIT: u32 = 50;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    gemini: Arc<GeminiGateway>,
    youtube: Arc<YouTubeGateway>,
    // The conversation shown on the chat page, driven by the same gateways
    orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::new();
        let gemini = Arc::new(GeminiGateway::from_config(client.clone(), config));
        let youtube = Arc::new(YouTubeGateway::from_config(client, config));
        let orchestrator = Arc::new(Orchestrator::new(gemini.clone(), youtube.clone()));
        Self {
            templates: Arc::new(create_minijinja_env(config.templates_dir.clone())),
            gemini,
            youtube,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    // Use AutoReloader for development convenience
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

#[derive(Serialize)]
struct VideoView<'a> {
    id: &'a str,
    title: &'a str,
    thumbnail: &'a str,
    watch_url: String,
}

async fn index_handler(State(state): State<AppState>) -> Response {
    let conversation = state.orchestrator.snapshot().await;
    let videos: Vec<VideoView<'_>> = conversation
        .videos()
        .iter()
        .map(|v| VideoView {
            id: &v.external_id,
            title: &v.title,
            thumbnail: if v.thumbnail_url.is_empty() {
                THUMBNAIL_PLACEHOLDER
            } else {
                &v.thumbnail_url
            },
            watch_url: v.watch_url(),
        })
        .collect();
    let submission = conversation.state();

    // Acquire env, get template, and render within the same block
    let rendered = state.templates.acquire_env().and_then(|env| {
        env.get_template("index.html").and_then(|tmpl| {
            tmpl.render(minijinja::context! {
                title => "I-Tube",
                messages => conversation.messages(),
                videos => &videos,
                is_loading => submission.is_loading,
                last_error => &submission.last_error,
                video_mode_enabled => submission.video_mode_enabled,
                draft => &submission.draft_text,
            })
        })
    });

    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize, Debug)]
struct SubmitForm {
    #[serde(default)]
    message: String,
    // Checkbox: present ("on") when ticked, absent otherwise
    #[serde(default)]
    video: Option<String>,
}

async fn submit_handler(State(state): State<AppState>, Form(form): Form<SubmitForm>) -> Redirect {
    let orchestrator = state.orchestrator.clone();
    let video_mode = form.video.is_some();

    // Run on its own task so a dropped connection cannot cut a submission short.
    let submission = tokio::spawn(async move {
        orchestrator
            .submit_with_video_mode(form.message, video_mode)
            .await
    });
    match submission.await {
        Ok(outcome) => info!(?outcome, "Form submission handled"),
        Err(e) => error!("Submission task failed: {:?}", e),
    }
    Redirect::to("/")
}

async fn conversation_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.orchestrator.snapshot().await)
}

fn chat_error(err: GatewayError) -> ApiError {
    match err {
        GatewayError::Upstream { status, message } => ApiError::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            message,
        ),
        GatewayError::Transport { message, details } => {
            ApiError::internal(message).with_details(details)
        }
        GatewayError::Configuration(message)
        | GatewayError::EmptyResponse(message)
        | GatewayError::MalformedResponse(message) => ApiError::internal(message),
    }
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        error!("Chat API error: {}", e);
        ApiError::internal(CHAT_REQUEST_FAILED).with_details(e.to_string())
    })?;

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::bad_request(MESSAGE_REQUIRED))?;

    let response = state.gemini.complete(message).await.map_err(chat_error)?;
    Ok(Json(json!({ "response": response })))
}

#[derive(Deserialize, Debug)]
struct VideoQuery {
    q: Option<String>,
    // Kept as text so a bad value falls back to the default instead of
    // producing a non-JSON rejection.
    limit: Option<String>,
}

fn video_error(err: GatewayError) -> ApiError {
    match err {
        GatewayError::Upstream { message, .. } => {
            ApiError::internal(YOUTUBE_API_ERROR).with_details(message)
        }
        GatewayError::Transport { message, details } => {
            ApiError::internal(message).with_details(details)
        }
        GatewayError::Configuration(message)
        | GatewayError::EmptyResponse(message)
        | GatewayError::MalformedResponse(message) => ApiError::internal(message),
    }
}

async fn youtube_handler(
    State(state): State<AppState>,
    Query(params): Query<VideoQuery>,
) -> Result<Json<Value>, ApiError> {
    let query = params
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request(QUERY_REQUIRED))?;
    let limit = params
        .limit
        .and_then(|l| l.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_VIDEO_LIMIT)
        .clamp(1, MAX_VIDEO_LIMIT);

    let results = state
        .youtube
        .search_raw(&query, limit)
        .await
        .map_err(video_error)?;
    Ok(Json(results.into_payload()))
}

/// Builds the application router. `static_dir` is served under `/static`.
pub fn create_router(state: AppState, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/submit", post(submit_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/youtube", get(youtube_handler))
        .route("/api/conversation", get(conversation_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http())) // Add request logging
}

pub async fn start_web_server(port: u16, config: Config) -> Result<()> {
    if config::credential(&config.gemini_api_key).is_none() {
        warn!("GEMINI_API_KEY is not set; chat requests will fail until it is configured");
    }
    if config::credential(&config.youtube_api_key).is_none() {
        warn!("YOUTUBE_API_KEY is not set; video search will fail until it is configured");
    }

    let state = AppState::new(&config);
    let app = create_router(state, config.static_dir.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    // Bind using tokio::net::TcpListener
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
