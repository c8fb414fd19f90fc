use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use hanseg_core::Segmenter;

#[derive(Clone)]
pub struct AppState {
    pub segmenter: Arc<Segmenter>,
    pub max_text_len: usize,
    pub disable_cache: bool,
}

#[derive(Deserialize)]
pub struct SegmentQuery {
    pub text: Option<String>,
}

#[derive(Serialize)]
pub struct SegmentResponse {
    segments: Vec<SegmentItem>,
}

#[derive(Serialize)]
struct SegmentItem {
    text: String,
    pos: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(frontend))
        .route("/robots.txt", get(robots))
        .route("/healthz", get(healthz))
        .route("/v1/segment", get(segment_get).post(segment_post))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn robots(State(state): State<AppState>) -> Response {
    let headers = axum::http::HeaderMap::from_iter([
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        ),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=86400, immutable"),
        ),
    ]);
    if state.disable_cache {
        return "User-agent: *\nDisallow: /".into_response();
    }
    (headers, "User-agent: *\nDisallow: /").into_response()
}

async fn frontend(State(state): State<AppState>) -> Response {
    let html = Html(segment_html());
    if state.disable_cache {
        return html.into_response();
    }
    (
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600, immutable"),
        )],
        html,
    )
        .into_response()
}

async fn segment_get(
    State(state): State<AppState>,
    Query(params): Query<SegmentQuery>,
) -> Result<Response, ApiError> {
    run_segment(&state, params.text.unwrap_or_default())
}

async fn segment_post(
    State(state): State<AppState>,
    Form(params): Form<SegmentQuery>,
) -> Result<Response, ApiError> {
    run_segment(&state, params.text.unwrap_or_default())
}

fn run_segment(state: &AppState, text: String) -> Result<Response, ApiError> {
    if text.len() > state.max_text_len {
        return Err(ApiError::bad_request(format!(
            "text must be at most {} bytes",
            state.max_text_len
        )));
    }

    let segments = state.segmenter.segment(text.as_bytes());
    let response = SegmentResponse {
        segments: segments
            .into_iter()
            .map(|s| SegmentItem {
                text: s.text,
                pos: s.pos,
            })
            .collect(),
    };

    Ok(Json(response).into_response())
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

const BASE_HTML: &str = include_str!("../templates/base.html");
const STYLE_HTML: &str = include_str!("../templates/style.html");
const SEGMENT_BODY_HTML: &str = include_str!("../templates/segment_body.html");
const SEGMENT_SCRIPT: &str = include_str!("../templates/segment_script.js");

fn render_page(title: &str, body: &str, script: &str) -> String {
    BASE_HTML
        .replace("{{title}}", title)
        .replace("{{style}}", STYLE_HTML)
        .replace("{{body}}", body)
        .replace("{{scripts}}", &format!("<script>{}</script>", script))
}

fn segment_html() -> String {
    render_page("Word Segmenter", SEGMENT_BODY_HTML, SEGMENT_SCRIPT)
}
