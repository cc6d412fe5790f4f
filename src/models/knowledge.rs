use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::DocumentType;

/// A previously validated extraction, kept as a few-shot example for the
/// extraction engine. Created only by pipeline promotion; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseExample {
    pub id: Uuid,
    pub document_type: DocumentType,
    pub carrier: String,
    pub source_text: String,
    pub extracted_data: serde_json::Value,
    pub confidence_score: f32,
    pub validated_by: String,
    pub validated_date: DateTime<Utc>,
}
