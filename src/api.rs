//! HTTP handlers for the analysis API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Row};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::batch;
use crate::config::Config;
use crate::dialect::{self, Dialect};
use crate::inference::{InferenceClient, InferenceError, Sentiment, SentimentScores};
use crate::text;

/// Shared state passed to every handler.
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub inference: InferenceClient,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    pub text: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeContentRequest {
    pub title: String,
    pub description: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchItem {
    pub text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SummarizeRequest {
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SummarizeResponse {
    pub summary: String,
    pub model_source: String,
}

/// One assembled analysis, as returned to the dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalysisResponse {
    pub id: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub positive_prob: f64,
    pub negative_prob: f64,
    pub dialect: Dialect,
    pub dialect_confidence: f64,
    pub model_source: String,
    pub category: Option<String>,
    pub keywords: Vec<String>,
    /// False when the row failed to persist; the analysis is still shown.
    pub saved: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchItemOutcome {
    pub index: usize,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemOutcome>,
}

/// Stored analysis row read back from Postgres.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema, FromRow)]
pub struct AnalysisRow {
    pub id: String,
    pub user_id: String,
    pub project_id: Option<String>,
    pub content: String,
    pub sentiment: String,
    pub confidence: f64,
    pub positive_prob: f64,
    pub negative_prob: f64,
    pub dialect: String,
    pub dialect_confidence: f64,
    pub model_source: String,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub keywords: Option<serde_json::Value>,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub total: i64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    pub jordanian: i64,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub jordanian_pct: f64,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

// ============================================================================
// Analysis pipeline
// ============================================================================

pub(crate) enum AnalysisFailure {
    Validation(&'static str),
    Upstream(InferenceError),
}

impl AnalysisFailure {
    fn message(&self) -> String {
        match self {
            AnalysisFailure::Validation(msg) => (*msg).to_string(),
            AnalysisFailure::Upstream(e) => e.to_string(),
        }
    }

    fn into_api_error(self) -> ApiError {
        match self {
            AnalysisFailure::Validation(msg) => api_error(StatusCode::BAD_REQUEST, msg),
            AnalysisFailure::Upstream(e) => {
                eprintln!("🔥 Inference error: {}", e);
                api_error(StatusCode::BAD_GATEWAY, "analysis service unavailable")
            }
        }
    }
}

/// Run the full pipeline for one text: validate, classify remotely, score
/// dialect locally, assemble, persist. Persistence failure does not
/// withhold the result (`saved: false`).
pub(crate) async fn run_analysis(
    state: &AppState,
    user_id: &str,
    project_id: Option<&str>,
    input: &str,
) -> Result<AnalysisResponse, AnalysisFailure> {
    let trimmed = text::validate_input(input).map_err(AnalysisFailure::Validation)?;

    // Remote call first, local heuristic after; the two share no state.
    let scores = match state.inference.classify_sentiment(trimmed).await {
        Ok(scores) => scores,
        Err(InferenceError::Shape(reason)) => {
            // Known upstream quirk: unrecognized bodies degrade to the
            // neutral result instead of failing the request.
            tracing::warn!("unparseable sentiment response, defaulting to neutral: {reason}");
            SentimentScores::neutral_fallback()
        }
        Err(e) => return Err(AnalysisFailure::Upstream(e)),
    };

    let dialect_score = dialect::detect_dialect(trimmed);
    let category = text::categorize(trimmed);
    let keywords = text::extract_keywords(trimmed, 5);

    let id = Uuid::new_v4().to_string();
    let insert = sqlx::query(
        r#"
        INSERT INTO content_analyses (
            id, user_id, project_id, content, sentiment, confidence,
            positive_prob, negative_prob, dialect, dialect_confidence,
            model_source, category, keywords
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(project_id)
    .bind(trimmed)
    .bind(scores.sentiment.as_str())
    .bind(scores.confidence)
    .bind(scores.positive_prob)
    .bind(scores.negative_prob)
    .bind(dialect_score.dialect.as_str())
    .bind(dialect_score.confidence)
    .bind(state.inference.model_source())
    .bind(category)
    .bind(serde_json::json!(keywords))
    .execute(&state.pool)
    .await;

    let saved = match insert {
        Ok(_) => true,
        Err(e) => {
            eprintln!("⚠️ Failed to persist analysis {}: {}", id, e);
            false
        }
    };

    Ok(AnalysisResponse {
        id,
        sentiment: scores.sentiment,
        confidence: scores.confidence,
        positive_prob: scores.positive_prob,
        negative_prob: scores.negative_prob,
        dialect: dialect_score.dialect,
        dialect_confidence: dialect_score.confidence,
        model_source: state.inference.model_source().to_string(),
        category: category.map(|c| c.to_string()),
        keywords,
        saved,
    })
}

fn join_title_description(title: &str, description: &str) -> String {
    let title = title.trim();
    let description = description.trim();
    if title.is_empty() {
        description.to_string()
    } else if description.is_empty() {
        title.to_string()
    } else {
        format!("{}. {}", title, description)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Analyze a single text
#[utoipa::path(
    post,
    path = "/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Assembled analysis result", body = AnalysisResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 502, description = "Inference endpoint unavailable", body = ErrorResponse)
    ),
    tag = "analysis"
)]
pub async fn analyze_text(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    run_analysis(&state, &user.id, req.project_id.as_deref(), &req.text)
        .await
        .map(Json)
        .map_err(AnalysisFailure::into_api_error)
}

/// Analyze an article given as title + description
#[utoipa::path(
    post,
    path = "/analyze/content",
    request_body = AnalyzeContentRequest,
    responses(
        (status = 200, description = "Assembled analysis result", body = AnalysisResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 502, description = "Inference endpoint unavailable", body = ErrorResponse)
    ),
    tag = "analysis"
)]
pub async fn analyze_content(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<AnalyzeContentRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let combined = join_title_description(&req.title, &req.description);
    run_analysis(&state, &user.id, req.project_id.as_deref(), &combined)
        .await
        .map(Json)
        .map_err(AnalysisFailure::into_api_error)
}

/// Maximum number of items accepted in one batch request.
const MAX_BATCH_ITEMS: usize = 50;

/// Analyze a batch of texts with bounded concurrency
#[utoipa::path(
    post,
    path = "/analyze/batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Per-item outcomes in input order", body = BatchResponse),
        (status = 400, description = "Invalid batch", body = ErrorResponse)
    ),
    tag = "analysis"
)]
pub async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    if req.items.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "batch is empty"));
    }
    if req.items.len() > MAX_BATCH_ITEMS {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("batch exceeds {} items", MAX_BATCH_ITEMS),
        ));
    }

    let user_id = Arc::new(user.id);
    let project_id = Arc::new(req.project_id);
    let shared = state.clone();

    let results = batch::map_bounded(
        req.items,
        state.config.batch_concurrency,
        move |index, item: BatchItem| {
            let state = shared.clone();
            let user_id = user_id.clone();
            let project_id = project_id.clone();
            async move {
                match run_analysis(&state, &user_id, project_id.as_deref(), &item.text).await {
                    Ok(analysis) => BatchItemOutcome {
                        index,
                        ok: true,
                        analysis: Some(analysis),
                        error: None,
                    },
                    Err(failure) => BatchItemOutcome {
                        index,
                        ok: false,
                        analysis: None,
                        error: Some(failure.message()),
                    },
                }
            }
        },
    )
    .await;

    let succeeded = results.iter().filter(|r| r.ok).count();
    Ok(Json(BatchResponse {
        total: results.len(),
        succeeded,
        failed: results.len() - succeeded,
        results,
    }))
}

/// Summarize a text via the remote mT5 endpoint
#[utoipa::path(
    post,
    path = "/summarize",
    request_body = SummarizeRequest,
    responses(
        (status = 200, description = "Generated summary", body = SummarizeResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 502, description = "Inference endpoint unavailable", body = ErrorResponse)
    ),
    tag = "analysis"
)]
pub async fn summarize(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let trimmed = text::validate_input(&req.text)
        .map_err(|msg| api_error(StatusCode::BAD_REQUEST, msg))?;

    let summary = state.inference.summarize(trimmed).await.map_err(|e| {
        eprintln!("🔥 Summarization error: {}", e);
        api_error(StatusCode::BAD_GATEWAY, "summarization service unavailable")
    })?;

    Ok(Json(SummarizeResponse {
        summary,
        model_source: state.inference.summarize_source().to_string(),
    }))
}

/// List stored analyses for the authenticated user
#[utoipa::path(
    get,
    path = "/analyses",
    params(("limit" = Option<i64>, Query, description = "Max rows to return (default and cap 50)")),
    responses(
        (status = 200, description = "Stored rows, newest first", body = [AnalysisRow])
    ),
    tag = "results"
)]
pub async fn list_analyses(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AnalysisRow>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 50);

    let rows: Vec<AnalysisRow> = sqlx::query_as(
        r#"SELECT id, user_id, project_id, content, sentiment, confidence,
           positive_prob, negative_prob, dialect, dialect_confidence,
           model_source, summary, category, keywords,
           to_char(created_at, 'YYYY-MM-DD HH24:MI:SS') as created_at
           FROM content_analyses WHERE user_id = $1
           ORDER BY created_at DESC LIMIT $2"#,
    )
    .bind(&user.id)
    .bind(limit)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| {
        eprintln!("🔥 DB Error: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load analyses")
    })?;

    Ok(Json(rows))
}

/// Fetch one stored analysis
#[utoipa::path(
    get,
    path = "/analyses/{analysis_id}",
    params(("analysis_id" = String, Path, description = "Analysis row id")),
    responses(
        (status = 200, description = "Stored row", body = AnalysisRow),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "results"
)]
pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(analysis_id): Path<String>,
) -> Result<Json<AnalysisRow>, ApiError> {
    let row: Option<AnalysisRow> = sqlx::query_as(
        r#"SELECT id, user_id, project_id, content, sentiment, confidence,
           positive_prob, negative_prob, dialect, dialect_confidence,
           model_source, summary, category, keywords,
           to_char(created_at, 'YYYY-MM-DD HH24:MI:SS') as created_at
           FROM content_analyses WHERE id = $1 AND user_id = $2"#,
    )
    .bind(&analysis_id)
    .bind(&user.id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        eprintln!("🔥 DB Error: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load analysis")
    })?;

    row.map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "analysis not found"))
}

/// Aggregate sentiment/dialect counts for the authenticated user
#[utoipa::path(
    get,
    path = "/analyses/stats",
    responses(
        (status = 200, description = "Aggregate counts and percentages", body = StatsResponse)
    ),
    tag = "results"
)]
pub async fn analysis_stats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let row = sqlx::query(
        r#"SELECT COUNT(*) AS total,
           COUNT(*) FILTER (WHERE sentiment = 'positive') AS positive,
           COUNT(*) FILTER (WHERE sentiment = 'negative') AS negative,
           COUNT(*) FILTER (WHERE sentiment = 'neutral') AS neutral,
           COUNT(*) FILTER (WHERE dialect = 'Jordanian') AS jordanian
           FROM content_analyses WHERE user_id = $1"#,
    )
    .bind(&user.id)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        eprintln!("🔥 DB Error: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load stats")
    })?;

    let total: i64 = row.get("total");
    let positive: i64 = row.get("positive");
    let negative: i64 = row.get("negative");
    let neutral: i64 = row.get("neutral");
    let jordanian: i64 = row.get("jordanian");

    Ok(Json(StatsResponse {
        total,
        positive,
        negative,
        neutral,
        jordanian,
        positive_pct: pct(positive, total),
        negative_pct: pct(negative, total),
        jordanian_pct: pct(jordanian, total),
    }))
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "analysis"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "arab-insights-api".to_string(),
    })
}

/// Share of `part` in `total` as a percentage with one decimal.
fn pct(part: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}
