//! HTTP routes

pub mod documents;
pub mod pdf;
pub mod question;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Upload and document management under `/pdf`
pub fn pdf_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(pdf::upload_pdf).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/documents", get(documents::list_documents))
        .route(
            "/documents/:id",
            get(documents::get_document).delete(documents::delete_document),
        )
}

/// Question answering, with and without the trailing slash
pub fn question_routes() -> Router<AppState> {
    Router::new()
        .route("/question", post(question::ask_question))
        .route("/question/", post(question::ask_question))
}
