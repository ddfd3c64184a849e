//! Question endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{QuestionRequest, QuestionResponse};

/// POST /question - Answer a question from the indexed PDFs
pub async fn ask_question(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<QuestionResponse>> {
    let start = Instant::now();

    let Json(request) = payload.map_err(|e| {
        tracing::debug!("Rejected question body: {}", e);
        Error::InvalidRequest
    })?;

    if request.question.trim().is_empty() {
        return Err(Error::InvalidRequest);
    }

    let answer = state.chain().ask(&request.question).await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Answered question with {} sources in {}ms",
        answer.sources.len(),
        processing_time_ms
    );

    Ok(Json(QuestionResponse {
        answer: answer.answer,
        sources: answer.sources,
        processing_time_ms,
    }))
}
