//! PDF upload endpoint

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::ingestion::{allowed_file, create_upload_folder, save_file, PdfLoader};
use crate::server::state::AppState;
use crate::types::{Document, DocumentSummary, UploadResponse};

const UPLOAD_FIELD: &str = "file";

/// POST /pdf/upload - Save a PDF and index its text
pub async fn upload_pdf(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let start = Instant::now();

    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected upload body: {}", e);
        Error::NoFilePart
    })?;
    let (filename, data) = read_file_field(&mut multipart).await?;

    if filename.is_empty() {
        return Err(Error::NoSelectedFile);
    }

    let filename = filename.trim().to_string();
    if !allowed_file(&filename, &state.config().upload.allowed_extensions) {
        return Err(Error::InvalidExtension);
    }

    tracing::info!("Received upload: {} ({} bytes)", filename, data.len());

    let upload_dir = &state.config().upload.upload_path;
    create_upload_folder(upload_dir).await?;
    let stored_path = save_file(upload_dir, &filename, &data).await?;

    let load_path = stored_path.clone();
    let loaded = tokio::task::spawn_blocking(move || PdfLoader::load_file(&load_path))
        .await
        .map_err(|e| Error::internal(format!("PDF loading task failed: {}", e)))??;

    let _guard = state.ingest_guard().await;

    if let Some(existing) = state.find_by_hash(&loaded.content_hash) {
        tracing::info!(
            "'{}' has the same content as already indexed '{}', skipping",
            filename,
            existing.filename
        );
        return Ok(Json(UploadResponse {
            message: "File uploaded successfully".to_string(),
            document: DocumentSummary::from(&existing),
            duplicate: true,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }));
    }

    let mut doc = Document::new(
        filename,
        stored_path.display().to_string(),
        loaded.content_hash.clone(),
        data.len() as u64,
    );

    state
        .pipeline()
        .process(
            &mut doc,
            &loaded,
            state.embedding_provider().as_ref(),
            state.vector_store_provider().as_ref(),
        )
        .await?;

    let summary = DocumentSummary::from(&doc);
    let id = doc.id;
    if let Err(e) = state.add_document(doc).await {
        state.discard_chunks(&id).await;
        return Err(e);
    }

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        document: summary,
        duplicate: false,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Read the first `file` field that carries a filename
///
/// Fields without a filename are form values, not files, and are skipped.
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let data = field.bytes().await.map_err(multipart_error)?;
        return Ok((filename, data));
    }

    Err(Error::NoFilePart)
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge
    } else {
        tracing::debug!("Malformed multipart body: {}", e);
        Error::NoFilePart
    }
}
