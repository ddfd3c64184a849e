//! Document registry endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::DocumentSummary;

/// GET /pdf/documents
pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentSummary>> {
    Json(
        state
            .list_documents()
            .iter()
            .map(DocumentSummary::from)
            .collect(),
    )
}

/// GET /pdf/documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentSummary>> {
    let id = parse_id(&id)?;
    state
        .get_document(&id)
        .map(|doc| Json(DocumentSummary::from(&doc)))
        .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
}

/// DELETE /pdf/documents/:id
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = parse_id(&id)?;
    let (doc, chunks_removed) = state.delete_document(&id).await?;

    Ok(Json(json!({
        "message": "Document deleted",
        "id": doc.id,
        "filename": doc.filename,
        "chunks_removed": chunks_removed,
    })))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::DocumentNotFound(raw.to_string()))
}
