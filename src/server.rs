//! HTTP API for curriculum extraction and topic matching.
//!
//! Endpoints:
//!
//! - `POST /api/upload`            — PDF upload → page images + per-page text
//! - `POST /api/clean-text`        — extracted text → grade-delimited text
//! - `POST /api/create-curriculum` — delimited text → metadata + tree
//! - `POST /api/match`             — topic → scored taxonomy skills
//! - `POST /api/standards`         — topic + jurisdiction → scored standards
//! - `GET  /health`                — liveness probe
//!
//! Built on Axum. Handlers own HTTP concerns only (field validation, status
//! codes, DTO shapes); all real work lives in the pipeline modules, reached
//! through the injected oracle and taxonomy in [`AppState`].

use crate::categorize::{categorize_skills, categorize_standards};
use crate::config::ServiceConfig;
use crate::error::CurriculumError;
use crate::oracle::Oracle;
use crate::pipeline::clean::clean_text;
use crate::pipeline::extract::{analyze_pages, rasterize_pdf, PageAnalysis};
use crate::pipeline::structure::{create_curriculum, CurriculumExtraction, SchoolMetadata};
use crate::skills::{match_topic, MatchedSkill};
use crate::standards::{find_standards, StandardRecord};
use crate::taxonomy::Taxonomy;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Uploaded PDFs are rejected above this size. Scanned curriculum documents
/// run a few hundred KB per page; 50 MB covers triple-digit page counts.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state: everything a handler needs, built once at boot.
pub struct AppState {
    pub oracle: Arc<dyn Oracle>,
    pub taxonomy: Arc<Taxonomy>,
    pub config: Arc<ServiceConfig>,
}

pub type SharedState = Arc<AppState>;

/// Build the Axum router with all service routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/clean-text", post(clean_text_handler))
        .route("/api/create-curriculum", post(create_curriculum_handler))
        .route("/api/match", post(match_handler))
        .route("/api/standards", post(standards_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

// ── Error mapping ─────────────────────────────────────────────────────────

/// An error response: status code plus `{ error, details? }` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.into(),
            details: None,
        }
    }

    fn internal(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: message.into(),
            details: Some(details.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.error,
                details: self.details,
            }),
        )
            .into_response()
    }
}

impl From<CurriculumError> for ApiError {
    fn from(e: CurriculumError) -> Self {
        error!("request failed: {e}");
        match &e {
            CurriculumError::RasterizeFailed { detail, .. } => {
                ApiError::internal("Failed to extract images from PDF.", detail.clone())
            }
            CurriculumError::RasterizerUnavailable { .. } | CurriculumError::NoPages => {
                ApiError::internal("Failed to extract images from PDF.", e.to_string())
            }
            CurriculumError::ScratchIo { .. } => {
                ApiError::internal("Failed to process PDF.", e.to_string())
            }
            _ => ApiError::internal("Internal server error", e.to_string()),
        }
    }
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    page_images: Vec<String>,
    ai_analysis: Vec<PageAnalysis>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CleanTextRequest {
    #[serde(default)]
    extracted_text: Vec<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CleanTextResponse {
    cleaned_text: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCurriculumRequest {
    #[serde(default)]
    cleaned_text: String,
}

#[derive(Serialize, Deserialize)]
struct CurriculumResponse {
    metadata: SchoolMetadata,
    curriculum: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct MatchRequest {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    grade: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchResponse {
    skills: Vec<MatchedSkill>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    batches_processed: usize,
}

#[derive(Serialize, Deserialize)]
struct StandardsRequest {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    grade: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct StandardsResponse {
    standards: Vec<StandardRecord>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /api/upload`: multipart field `pdfFile` → page images + analyses.
async fn upload_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut pdf_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("pdfFile") {
            continue;
        }
        if field.content_type() != Some("application/pdf") {
            return Err(ApiError::bad_request("Only PDF files are allowed."));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed upload: {e}")))?;
        pdf_bytes = Some(bytes.to_vec());
    }

    let pdf_bytes = pdf_bytes.ok_or_else(|| ApiError::bad_request("No file uploaded."))?;

    // Content-type headers lie; the magic bytes do not.
    if !pdf_bytes.starts_with(b"%PDF") {
        return Err(ApiError::bad_request("Only PDF files are allowed."));
    }

    info!("processing uploaded PDF: {} bytes", pdf_bytes.len());
    let pages = rasterize_pdf(&pdf_bytes, &state.config).await?;
    let scan = analyze_pages(&state.oracle, &pages, &state.config).await;

    Ok(Json(UploadResponse {
        page_images: scan.page_images,
        ai_analysis: scan.analyses,
    }))
}

/// `POST /api/clean-text`: per-page extracted text → grade-delimited text.
async fn clean_text_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CleanTextRequest>,
) -> Result<Json<CleanTextResponse>, ApiError> {
    if payload.extracted_text.is_empty() {
        return Err(ApiError::bad_request("No extracted text provided."));
    }

    let cleaned_text = clean_text(&state.oracle, &payload.extracted_text, &state.config)
        .await
        .map_err(|e| {
            error!("clean-text failed: {e}");
            ApiError::internal("Failed to clean curriculum text", e.to_string())
        })?;

    Ok(Json(CleanTextResponse { cleaned_text }))
}

/// `POST /api/create-curriculum`: delimited text → metadata + merged tree.
async fn create_curriculum_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CreateCurriculumRequest>,
) -> Result<Json<CurriculumResponse>, ApiError> {
    if payload.cleaned_text.trim().is_empty() {
        return Err(ApiError::bad_request("No cleaned text provided."));
    }

    let CurriculumExtraction {
        metadata,
        curriculum,
        warnings,
    } = create_curriculum(&state.oracle, &payload.cleaned_text, &state.config)
        .await
        .map_err(|e| {
            error!("create-curriculum failed: {e}");
            ApiError::internal("Failed to create curriculum structure", e.to_string())
        })?;

    Ok(Json(CurriculumResponse {
        metadata,
        curriculum,
        warnings,
    }))
}

/// `POST /api/match`: topic → scored skills, optionally categorized by grade.
async fn match_handler(
    State(state): State<SharedState>,
    Json(payload): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    if payload.topic.trim().is_empty() {
        return Err(ApiError::bad_request("Topic is required"));
    }

    info!(
        "matching topic \"{}\" against {} skills",
        payload.topic,
        state.taxonomy.len()
    );
    let mut outcome = match_topic(&state.oracle, &state.taxonomy, &payload.topic, &state.config).await;

    // With a grade, shortlisted skills get a Core/Foundational label; the
    // labelled records replace their unlabelled counterparts, everything
    // below the shortlist threshold passes through untouched.
    if let Some(grade) = payload.grade.as_deref().filter(|g| !g.trim().is_empty()) {
        let shortlisted: Vec<MatchedSkill> = outcome
            .skills
            .iter()
            .filter(|s| s.relevancy_score >= state.config.skill_shortlist_min)
            .cloned()
            .collect();
        if !shortlisted.is_empty() {
            let categorized =
                categorize_skills(&state.oracle, &payload.topic, grade, &shortlisted, &state.config)
                    .await;
            outcome.skills = outcome
                .skills
                .into_iter()
                .map(|skill| {
                    categorized
                        .iter()
                        .find(|c| {
                            c.domain == skill.domain
                                && c.topic == skill.topic
                                && c.skill == skill.skill
                                && c.sub_skill == skill.sub_skill
                        })
                        .cloned()
                        .unwrap_or(skill)
                })
                .collect();
        }
    }

    Ok(Json(MatchResponse {
        skills: outcome.skills,
        errors: outcome.errors,
        batches_processed: outcome.batches_processed,
    }))
}

/// `POST /api/standards`: topic + jurisdiction → scored standards.
async fn standards_handler(
    State(state): State<SharedState>,
    Json(payload): Json<StandardsRequest>,
) -> Result<Json<StandardsResponse>, ApiError> {
    if payload.topic.trim().is_empty() || payload.state.trim().is_empty() {
        return Err(ApiError::bad_request("Topic and state are required"));
    }

    let mut standards =
        find_standards(&state.oracle, &payload.topic, &payload.state, &state.config).await;

    if let Some(grade) = payload.grade.as_deref().filter(|g| !g.trim().is_empty()) {
        let shortlisted: Vec<StandardRecord> = standards
            .iter()
            .filter(|s| s.relevancy_score >= state.config.standards_shortlist_min)
            .cloned()
            .collect();
        if !shortlisted.is_empty() {
            let categorized = categorize_standards(
                &state.oracle,
                &payload.topic,
                grade,
                &shortlisted,
                &state.config,
            )
            .await;
            standards = standards
                .into_iter()
                .map(|standard| {
                    categorized
                        .iter()
                        .find(|c| c.code == standard.code)
                        .cloned()
                        .unwrap_or(standard)
                })
                .collect();
        }
    }

    Ok(Json(StandardsResponse { standards }))
}

// ── Tests ─────────────────────────────────────────────────────────────────
