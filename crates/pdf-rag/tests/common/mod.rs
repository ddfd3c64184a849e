//! Shared helpers for HTTP tests: provider mocks, PDF fixtures and request builders

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use pdf_rag::{
    providers::{EmbeddingProvider, LlmProvider},
    AppState, Error, RagConfig, RagServer, Result,
};

pub const BOUNDARY: &str = "pdfragtestboundary";

// ============= Mock providers =============

/// Letter-count embeddings folded into 8 buckets
pub struct MockEmbedder;

impl MockEmbedder {
    pub const DIMENSIONS: usize = 8;
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0; Self::DIMENSIONS];
        for b in text.bytes().filter(u8::is_ascii_alphabetic) {
            v[(b.to_ascii_lowercase() - b'a') as usize % Self::DIMENSIONS] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Canned answers; records every prompt
pub struct MockLlm {
    answer: String,
    fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.fail {
            return Err(Error::llm("Mock LLM failure"));
        }
        Ok(self.answer.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

// ============= App setup =============

pub fn test_config(dir: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.upload.upload_path = dir.join("db");
    config.vector_db.storage_path = dir.join("faiss_db");
    config
}

pub async fn test_app(config: RagConfig, llm: Arc<MockLlm>) -> Router {
    let state = AppState::with_providers(config, Arc::new(MockEmbedder), llm)
        .await
        .unwrap();
    RagServer::with_state(state).router()
}

// ============= Fixtures =============

/// A PDF with one page per entry, each showing its text in Courier
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

// ============= Requests =============

/// A multipart part: (field name, optional filename, bytes)
pub type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::post("/pdf/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn upload_pdf_request(filename: &str, data: &[u8]) -> Request<Body> {
    upload_request(&[("file", Some(filename), data)])
}

pub fn question_request(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
