use std::time::Instant;

use chrono::Utc;

use super::client::InferenceClient;
use super::parser::parse_extraction_response;
use super::prompt::{build_extraction_prompt, EXTRACTION_SYSTEM_PROMPT};
use super::schema::DocumentData;
use super::ExtractionError;
use crate::models::{DocumentType, ExtractionMetadata, KnowledgeBaseExample};

/// Minimum cleaned input length worth sending to the model (characters).
const MIN_INPUT_LENGTH: usize = 20;

/// Maximum input length to send to the model (characters).
const MAX_INPUT_LENGTH: usize = 50_000;

/// One completed extraction, ready for validation and routing.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub data: DocumentData,
    pub confidence_score: f32,
    pub uncertain_fields: Vec<String>,
    pub metadata: ExtractionMetadata,
}

/// Drives one inference call per document group and coerces the reply
/// into typed data. Inference errors propagate to the caller; there is
/// no retry, a failed group is reported and the batch moves on.
pub struct ExtractionEngine {
    client: Box<dyn InferenceClient + Send + Sync>,
    model: String,
}

impl ExtractionEngine {
    pub fn new(client: Box<dyn InferenceClient + Send + Sync>, model: String) -> Self {
        Self { client, model }
    }

    pub fn extract(
        &self,
        raw_text: &str,
        document_type: DocumentType,
        carrier: &str,
        examples: &[KnowledgeBaseExample],
    ) -> Result<ExtractionResult, ExtractionError> {
        if document_type == DocumentType::Unknown {
            return Err(ExtractionError::UnsupportedType);
        }

        let cleaned = sanitize_input(raw_text);
        if cleaned.len() < MIN_INPUT_LENGTH {
            return Err(ExtractionError::InputTooShort {
                length: cleaned.len(),
                minimum: MIN_INPUT_LENGTH,
            });
        }

        let prompt = build_extraction_prompt(&cleaned, document_type, carrier, examples);

        tracing::debug!(
            document_type = %document_type,
            carrier = %carrier,
            examples = examples.len(),
            input_chars = cleaned.len(),
            "sending extraction request"
        );

        let started = Instant::now();
        let response = self
            .client
            .generate(&self.model, &prompt, EXTRACTION_SYSTEM_PROMPT)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let (data, confidence_score, uncertain_fields) =
            parse_extraction_response(&response.text, document_type)?;

        tracing::info!(
            document_type = %document_type,
            confidence = confidence_score,
            uncertain = uncertain_fields.len(),
            elapsed_ms,
            "extraction complete"
        );

        Ok(ExtractionResult {
            data,
            confidence_score,
            uncertain_fields,
            metadata: ExtractionMetadata {
                model_id: self.model.clone(),
                tokens_used: response.tokens_used,
                processing_time_ms: elapsed_ms,
                few_shot_examples_used: examples.len(),
                extraction_timestamp: Utc::now(),
            },
        })
    }
}

/// Strip invisible Unicode and control characters, normalize line endings,
/// and truncate. Keeps space, tab and newline.
fn sanitize_input(raw: &str) -> String {
    let cleaned: String = raw
        .replace("\r\n", "\n")
        .chars()
        .filter(|c| *c == ' ' || *c == '\t' || *c == '\n' || !(c.is_control() || is_invisible(*c)))
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.len() > MAX_INPUT_LENGTH {
        let mut end = MAX_INPUT_LENGTH;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        trimmed[..end].to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
    )
}
