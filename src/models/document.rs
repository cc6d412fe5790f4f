use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DocumentType, ProcessingStatus, ReviewAction};
use crate::pipeline::extraction::schema::DocumentData;

/// Metadata describing a single structured-extraction inference call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub model_id: String,
    pub tokens_used: Option<u64>,
    pub processing_time_ms: u64,
    pub few_shot_examples_used: usize,
    pub extraction_timestamp: DateTime<Utc>,
}

/// One entry in a document's append-only validation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationEvent {
    pub id: Uuid,
    pub document_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: ReviewAction,
    pub comments: Option<String>,
}

impl ValidationEvent {
    pub fn new(document_id: Uuid, actor: &str, action: ReviewAction, comments: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            timestamp: Utc::now(),
            actor: actor.to_string(),
            action,
            comments: comments.map(str::to_string),
        }
    }
}

/// Persistent record for one processed document group.
///
/// Written exactly once by the pipeline. `processing_status` is derived at
/// creation time from confidence + validation outcome; afterwards it only
/// changes through explicit review actions appended to `validation_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub document_type: DocumentType,
    pub document_number: String,
    pub carrier: String,
    pub uploaded_by: String,
    pub upload_timestamp: DateTime<Utc>,
    pub processing_status: ProcessingStatus,
    pub data: DocumentData,
    pub confidence_score: f32,
    pub uncertain_fields: Vec<String>,
    pub extraction_metadata: ExtractionMetadata,
    pub document_url: String,
    pub start_page: u32,
    pub end_page: u32,
    pub total_pages: u32,
    pub validation_history: Vec<ValidationEvent>,
}

impl DocumentRecord {
    /// Human-readable page range, e.g. "1-2" or "3" for a single page.
    pub fn page_range(&self) -> String {
        if self.start_page == self.end_page {
            self.start_page.to_string()
        } else {
            format!("{}-{}", self.start_page, self.end_page)
        }
    }
}
