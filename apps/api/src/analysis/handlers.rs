//! Axum route handlers for the analysis API.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::state::AppState;

use super::models::{AnalysisResult, NewsCategory};
use super::parser::parse_response;
use super::prompts::build_news_prompt;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub category: NewsCategory,
}

/// POST /api/v1/analysis
///
/// Runs one search-grounded analysis for the selected category. At most one
/// request is in flight at a time; overlapping calls are answered 409 so the
/// SPA's result grid can never be overwritten out of order. The permit is
/// released on drop, so an abandoned request (client disconnect during the
/// generation call) cannot leave the gate stuck.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, AppError> {
    let Some(permit) = state.gate.begin() else {
        return Err(AppError::Busy);
    };

    debug!("Analysis started: category={:?}", request.category);
    let prompt = build_news_prompt(request.category);

    let completion = state
        .llm
        .generate_grounded(&prompt)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    let result = parse_response(&completion.text, request.category, completion.citations);

    if !permit.is_latest() {
        // A result may only be applied while its token is the latest issued;
        // a superseded one is dropped, not rendered.
        warn!("Discarding stale analysis result: token={:?}", permit.token());
        return Err(AppError::Busy);
    }

    info!(
        "Analysis completed: category={:?}, items={}, citations={}",
        request.category,
        result.items.len(),
        result.citations.len()
    );

    Ok(Json(result))
}
