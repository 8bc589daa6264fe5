mod api;
mod auth;
mod batch;
mod config;
mod db;
mod dialect;
mod inference;
mod text;

use axum::{
    routing::{get, post},
    Router,
};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::analyze_text,
        api::analyze_content,
        api::analyze_batch,
        api::summarize,
        api::list_analyses,
        api::get_analysis,
        api::analysis_stats,
        api::health
    ),
    components(
        schemas(
            api::AnalyzeRequest,
            api::AnalyzeContentRequest,
            api::BatchItem,
            api::BatchRequest,
            api::BatchItemOutcome,
            api::BatchResponse,
            api::SummarizeRequest,
            api::SummarizeResponse,
            api::AnalysisResponse,
            api::AnalysisRow,
            api::StatsResponse,
            api::HealthResponse,
            api::ErrorResponse,
            crate::dialect::Dialect,
            crate::inference::Sentiment
        )
    ),
    tags(
        (name = "analysis", description = "Arabic content analysis"),
        (name = "results", description = "Stored analysis results")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env()?;
    let bind_addr = config.bind_addr.clone();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    db::init_db(&pool).await?;

    let inference = inference::InferenceClient::new(&config)?;
    let state = Arc::new(api::AppState {
        pool,
        config,
        inference,
    });

    // The dashboard frontend is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(SwaggerUi::new("/arab-insights-swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/analyze", post(api::analyze_text))
        .route("/analyze/content", post(api::analyze_content))
        .route("/analyze/batch", post(api::analyze_batch))
        .route("/summarize", post(api::summarize))
        .route("/analyses", get(api::list_analyses))
        .route("/analyses/stats", get(api::analysis_stats))
        .route("/analyses/:analysis_id", get(api::get_analysis))
        .route("/health", get(api::health))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
