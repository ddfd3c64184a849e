//! Request types

use serde::{Deserialize, Serialize};

/// Body of `POST /question`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    /// The question to answer
    pub question: String,
}

impl QuestionRequest {
    /// Create a new request
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}
