//! LLM-backed structured extraction.
//!
//! The engine sends segmented document text plus few-shot examples to an
//! inference endpoint and coerces the reply into a typed [`schema::DocumentData`].

pub mod client;
pub mod engine;
pub mod parser;
pub mod prompt;
pub mod schema;

pub use client::{HttpInferenceClient, InferenceClient, InferenceResponse};
pub use engine::{ExtractionEngine, ExtractionResult};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("cannot connect to inference endpoint at {url}")]
    Connection { url: String },

    #[error("inference provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("inference request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("model response contains no JSON payload")]
    MalformedResponse,

    #[error("model response is not valid JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("extracted data does not match the {document_type} schema: {reason}")]
    SchemaMismatch {
        document_type: String,
        reason: String,
    },

    #[error("document text too short to extract from ({length} chars, need {minimum})")]
    InputTooShort { length: usize, minimum: usize },

    #[error("cannot extract documents of unknown type")]
    UnsupportedType,
}
