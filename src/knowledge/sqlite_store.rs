use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{KnowledgeError, KnowledgeStore};
use crate::models::enums::DocumentType;
use crate::models::KnowledgeBaseExample;

// The knowledge base is an external store with its own lifecycle, so it
// bootstraps its own schema instead of sharing the document migrations.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS knowledge_examples (
    id TEXT PRIMARY KEY,
    document_type TEXT NOT NULL,
    carrier TEXT NOT NULL,
    source_text TEXT NOT NULL,
    extracted_data TEXT NOT NULL,
    confidence_score REAL NOT NULL,
    validated_by TEXT NOT NULL,
    validated_date TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_knowledge_type_carrier
    ON knowledge_examples (document_type, carrier, validated_date);
";

/// SQLite-backed knowledge store.
pub struct SqliteKnowledgeStore {
    conn: Mutex<Connection>,
}

impl SqliteKnowledgeStore {
    pub fn open(path: &Path) -> Result<Self, KnowledgeError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, KnowledgeError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KnowledgeStore for SqliteKnowledgeStore {
    fn query(
        &self,
        document_type: DocumentType,
        carrier: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeBaseExample>, KnowledgeError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| KnowledgeError::Unavailable(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, document_type, carrier, source_text, extracted_data,
             confidence_score, validated_by, validated_date
             FROM knowledge_examples
             WHERE document_type = ?1 AND (?2 = '' OR carrier = ?2)
             ORDER BY validated_date DESC, confidence_score DESC
             LIMIT ?3",
        )?;

        let rows = stmt.query_map(
            params![document_type.as_str(), carrier, limit as i64],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, f32>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            },
        )?;

        let mut examples = Vec::new();
        for row in rows {
            let (id, doc_type, carrier, source_text, data, confidence, validated_by, date) = row?;
            examples.push(KnowledgeBaseExample {
                id: Uuid::parse_str(&id)
                    .map_err(|e| KnowledgeError::Serialization(e.to_string()))?,
                document_type: DocumentType::from_str(&doc_type)
                    .map_err(|e| KnowledgeError::Serialization(e.to_string()))?,
                carrier,
                source_text,
                extracted_data: serde_json::from_str(&data)
                    .map_err(|e| KnowledgeError::Serialization(e.to_string()))?,
                confidence_score: confidence,
                validated_by,
                validated_date: DateTime::parse_from_rfc3339(&date)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| KnowledgeError::Serialization(e.to_string()))?,
            });
        }
        Ok(examples)
    }

    fn append(&self, example: &KnowledgeBaseExample) -> Result<(), KnowledgeError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| KnowledgeError::Unavailable(e.to_string()))?;

        conn.execute(
            "INSERT INTO knowledge_examples (id, document_type, carrier, source_text,
             extracted_data, confidence_score, validated_by, validated_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                example.id.to_string(),
                example.document_type.as_str(),
                example.carrier,
                example.source_text,
                serde_json::to_string(&example.extracted_data)
                    .map_err(|e| KnowledgeError::Serialization(e.to_string()))?,
                example.confidence_score,
                example.validated_by,
                example.validated_date.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn make_example(
    document_type: DocumentType,
    carrier: &str,
    confidence: f32,
    validated_date: DateTime<Utc>,
) -> KnowledgeBaseExample {
    KnowledgeBaseExample {
        id: Uuid::new_v4(),
        document_type,
        carrier: carrier.to_string(),
        source_text: format!("{carrier} {document_type} sample text"),
        extracted_data: serde_json::json!({"sample": true}),
        confidence_score: confidence,
        validated_by: "ops@example.com".into(),
        validated_date,
    }
}
