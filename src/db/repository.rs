use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::enums::{ProcessingStatus, ReviewAction};
use crate::models::{DocumentRecord, DocumentType, ExtractionMetadata, ValidationEvent};
use crate::pipeline::extraction::schema::DocumentData;

// ═══════════════════════════════════════════
// Document Repository
// ═══════════════════════════════════════════

/// Insert a new document record together with its initial validation history.
///
/// Rejects an id that already exists — document ids are content-derived, so a
/// collision means the same document content was already ingested.
pub fn insert_document(conn: &Connection, doc: &DocumentRecord) -> Result<(), DatabaseError> {
    if get_document(conn, &doc.id)?.is_some() {
        return Err(DatabaseError::DuplicateDocument(doc.id.to_string()));
    }

    conn.execute(
        "INSERT INTO documents (id, document_type, document_number, carrier, uploaded_by,
         upload_timestamp, processing_status, data, confidence_score, uncertain_fields,
         model_id, tokens_used, processing_time_ms, few_shot_examples_used,
         extraction_timestamp, document_url, start_page, end_page, total_pages)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            doc.id.to_string(),
            doc.document_type.as_str(),
            doc.document_number,
            doc.carrier,
            doc.uploaded_by,
            doc.upload_timestamp.to_rfc3339(),
            doc.processing_status.as_str(),
            serde_json::to_string(&doc.data)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            doc.confidence_score,
            serde_json::to_string(&doc.uncertain_fields)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            doc.extraction_metadata.model_id,
            doc.extraction_metadata.tokens_used,
            doc.extraction_metadata.processing_time_ms as i64,
            doc.extraction_metadata.few_shot_examples_used as i64,
            doc.extraction_metadata.extraction_timestamp.to_rfc3339(),
            doc.document_url,
            doc.start_page,
            doc.end_page,
            doc.total_pages,
        ],
    )?;

    for event in &doc.validation_history {
        insert_validation_event(conn, event)?;
    }

    Ok(())
}

pub fn get_document(conn: &Connection, id: &Uuid) -> Result<Option<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, document_type, document_number, carrier, uploaded_by, upload_timestamp,
         processing_status, data, confidence_score, uncertain_fields, model_id, tokens_used,
         processing_time_ms, few_shot_examples_used, extraction_timestamp, document_url,
         start_page, end_page, total_pages
         FROM documents WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok(DocumentRow {
            id: row.get::<_, String>(0)?,
            document_type: row.get::<_, String>(1)?,
            document_number: row.get::<_, String>(2)?,
            carrier: row.get::<_, String>(3)?,
            uploaded_by: row.get::<_, String>(4)?,
            upload_timestamp: row.get::<_, String>(5)?,
            processing_status: row.get::<_, String>(6)?,
            data: row.get::<_, String>(7)?,
            confidence_score: row.get::<_, f32>(8)?,
            uncertain_fields: row.get::<_, String>(9)?,
            model_id: row.get::<_, String>(10)?,
            tokens_used: row.get::<_, Option<i64>>(11)?,
            processing_time_ms: row.get::<_, i64>(12)?,
            few_shot_examples_used: row.get::<_, i64>(13)?,
            extraction_timestamp: row.get::<_, String>(14)?,
            document_url: row.get::<_, String>(15)?,
            start_page: row.get::<_, u32>(16)?,
            end_page: row.get::<_, u32>(17)?,
            total_pages: row.get::<_, u32>(18)?,
        })
    });

    match result {
        Ok(row) => {
            let mut doc = document_from_row(row)?;
            doc.validation_history = get_validation_history(conn, id)?;
            Ok(Some(doc))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Apply a review action: append the event and set the new status.
///
/// The validation history is append-only — status transitions always leave a
/// trail; the pipeline itself never calls this after creation.
pub fn update_document_status(
    conn: &Connection,
    id: &Uuid,
    status: ProcessingStatus,
    event: &ValidationEvent,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE documents SET processing_status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "DocumentRecord".into(),
            id: id.to_string(),
        });
    }
    insert_validation_event(conn, event)
}

pub fn insert_validation_event(
    conn: &Connection,
    event: &ValidationEvent,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO validation_events (id, document_id, timestamp, actor, action, comments)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.id.to_string(),
            event.document_id.to_string(),
            event.timestamp.to_rfc3339(),
            event.actor,
            event.action.as_str(),
            event.comments,
        ],
    )?;
    Ok(())
}

pub fn get_validation_history(
    conn: &Connection,
    document_id: &Uuid,
) -> Result<Vec<ValidationEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, document_id, timestamp, actor, action, comments
         FROM validation_events WHERE document_id = ?1 ORDER BY timestamp ASC",
    )?;

    let rows = stmt.query_map(params![document_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (id, document_id, timestamp, actor, action, comments) = row?;
        events.push(ValidationEvent {
            id: parse_uuid(&id)?,
            document_id: parse_uuid(&document_id)?,
            timestamp: parse_timestamp(&timestamp)?,
            actor,
            action: ReviewAction::from_str(&action)?,
            comments,
        });
    }
    Ok(events)
}

// Internal row type for DocumentRecord mapping
struct DocumentRow {
    id: String,
    document_type: String,
    document_number: String,
    carrier: String,
    uploaded_by: String,
    upload_timestamp: String,
    processing_status: String,
    data: String,
    confidence_score: f32,
    uncertain_fields: String,
    model_id: String,
    tokens_used: Option<i64>,
    processing_time_ms: i64,
    few_shot_examples_used: i64,
    extraction_timestamp: String,
    document_url: String,
    start_page: u32,
    end_page: u32,
    total_pages: u32,
}

fn document_from_row(row: DocumentRow) -> Result<DocumentRecord, DatabaseError> {
    let data: DocumentData = serde_json::from_str(&row.data)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    let uncertain_fields: Vec<String> = serde_json::from_str(&row.uncertain_fields)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;

    Ok(DocumentRecord {
        id: parse_uuid(&row.id)?,
        document_type: DocumentType::from_str(&row.document_type)?,
        document_number: row.document_number,
        carrier: row.carrier,
        uploaded_by: row.uploaded_by,
        upload_timestamp: parse_timestamp(&row.upload_timestamp)?,
        processing_status: ProcessingStatus::from_str(&row.processing_status)?,
        data,
        confidence_score: row.confidence_score,
        uncertain_fields,
        extraction_metadata: ExtractionMetadata {
            model_id: row.model_id,
            tokens_used: row.tokens_used.map(|t| t as u64),
            processing_time_ms: row.processing_time_ms as u64,
            few_shot_examples_used: row.few_shot_examples_used as usize,
            extraction_timestamp: parse_timestamp(&row.extraction_timestamp)?,
        },
        document_url: row.document_url,
        start_page: row.start_page,
        end_page: row.end_page,
        total_pages: row.total_pages,
        validation_history: Vec::new(),
    })
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
