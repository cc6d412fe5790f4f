//! Batch orchestration: one upload in, one summary out.
//!
//! Groups are processed sequentially and fail independently. A document
//! record only exists once its blob is stored, never the other way
//! around; an orphaned blob is recoverable garbage, an orphaned record
//! is a dangling reference.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::knowledge::{ExampleRetriever, KnowledgeStore};
use crate::models::{
    DocumentRecord, DocumentType, KnowledgeBaseExample, ProcessingStatus, ReviewAction,
    ValidationEvent,
};
use crate::pipeline::classify::classify;
use crate::pipeline::extraction::schema::DocumentData;
use crate::pipeline::extraction::ExtractionEngine;
use crate::pipeline::router::{derive_status, promotion_eligible};
use crate::pipeline::segmenter::{segment_pages, DocumentGroup, SegmenterConfig};
use crate::pipeline::validation::validate;
use crate::pipeline::PipelineError;
use crate::storage::BlobStore;

/// Actor recorded on pipeline-generated validation events.
const PIPELINE_ACTOR: &str = "pipeline";

/// Turns upload bytes into per-page text. Kept behind a trait so tests
/// and callers with pre-extracted text skip PDF handling entirely.
pub trait PageTextProvider {
    fn extract_pages(
        &self,
        bytes: &[u8],
        original_filename: &str,
    ) -> Result<Vec<String>, PipelineError>;
}

/// Provider for callers that already hold per-page text.
pub struct PrecomputedPages {
    pages: Vec<String>,
}

impl PrecomputedPages {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }
}

impl PageTextProvider for PrecomputedPages {
    fn extract_pages(&self, _bytes: &[u8], _filename: &str) -> Result<Vec<String>, PipelineError> {
        Ok(self.pages.clone())
    }
}

/// Cooperative cancellation, checked between document groups. A group
/// already in flight always runs to completion.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One uploaded file to be processed.
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub original_filename: String,
    pub uploaded_by: String,
}

/// Outcome for a single document group within an upload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DocumentOutcome {
    #[serde(rename_all = "camelCase")]
    Processed {
        id: Uuid,
        document_type: DocumentType,
        document_number: String,
        carrier: String,
        confidence_score: f32,
        processing_status: ProcessingStatus,
        page_range: String,
        validation_warnings: Vec<String>,
        validation_errors: Vec<String>,
        uncertain_fields: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        error: bool,
        document_id: Uuid,
        page_range: String,
        message: String,
    },
}

/// Result of processing one upload end to end.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub message: String,
    pub original_filename: String,
    pub total_pages: usize,
    pub documents_found: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub documents: Vec<DocumentOutcome>,
}

impl UploadSummary {
    /// An upload succeeds if at least one group produced a record.
    pub fn succeeded(&self) -> bool {
        self.success_count > 0
    }
}

/// The assembled pipeline. Collaborators are trait objects so each stage
/// is swappable in tests.
pub struct DocumentPipeline {
    provider: Box<dyn PageTextProvider + Send + Sync>,
    engine: ExtractionEngine,
    blob_store: Box<dyn BlobStore + Send + Sync>,
    knowledge: Box<dyn KnowledgeStore + Send + Sync>,
    segmenter_config: SegmenterConfig,
    auto_validate_threshold: f32,
    min_promotion_confidence: f32,
    max_few_shot_examples: usize,
}

impl DocumentPipeline {
    pub fn new(
        provider: Box<dyn PageTextProvider + Send + Sync>,
        engine: ExtractionEngine,
        blob_store: Box<dyn BlobStore + Send + Sync>,
        knowledge: Box<dyn KnowledgeStore + Send + Sync>,
    ) -> Self {
        Self {
            provider,
            engine,
            blob_store,
            knowledge,
            segmenter_config: SegmenterConfig::default(),
            auto_validate_threshold: 0.8,
            min_promotion_confidence: 0.85,
            max_few_shot_examples: 5,
        }
    }

    pub fn with_thresholds(
        mut self,
        auto_validate_threshold: f32,
        min_promotion_confidence: f32,
        max_few_shot_examples: usize,
    ) -> Self {
        self.auto_validate_threshold = auto_validate_threshold;
        self.min_promotion_confidence = min_promotion_confidence;
        self.max_few_shot_examples = max_few_shot_examples;
        self
    }

    /// Process one upload end to end.
    ///
    /// Batch-level failures (unreadable or empty upload, cancellation
    /// before work starts) return `Err`; everything per-group, storage
    /// and database failures included, lands in the summary instead.
    pub fn process_upload(
        &self,
        request: &UploadRequest,
        conn: &Connection,
        cancel: &CancelFlag,
    ) -> Result<UploadSummary, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let pages = self
            .provider
            .extract_pages(&request.bytes, &request.original_filename)?;
        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(PipelineError::EmptyUpload);
        }

        let groups = segment_pages(&pages, &self.segmenter_config);
        tracing::info!(
            filename = %request.original_filename,
            total_pages = pages.len(),
            documents_found = groups.len(),
            "upload segmented"
        );

        let mut documents = Vec::with_capacity(groups.len());
        let mut cancelled = false;

        for group in &groups {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            documents.push(self.process_group(group, request, pages.len(), conn));
        }

        let success_count = documents
            .iter()
            .filter(|d| matches!(d, DocumentOutcome::Processed { .. }))
            .count();
        let error_count = documents.len() - success_count;

        let message = if cancelled {
            format!(
                "Cancelled after {} of {} documents",
                documents.len(),
                groups.len()
            )
        } else {
            format!(
                "Processed {} of {} documents",
                success_count,
                groups.len()
            )
        };

        Ok(UploadSummary {
            message,
            original_filename: request.original_filename.clone(),
            total_pages: pages.len(),
            documents_found: groups.len(),
            success_count,
            error_count,
            documents,
        })
    }

    /// Run one group through classify → retrieve → extract → validate →
    /// route → persist. Never propagates an error; whatever goes wrong
    /// becomes a `Failed` outcome so the rest of the batch proceeds.
    fn process_group(
        &self,
        group: &DocumentGroup,
        request: &UploadRequest,
        total_pages: usize,
        conn: &Connection,
    ) -> DocumentOutcome {
        let page_range = page_range_label(group);
        let _span = tracing::info_span!("document_group", pages = %page_range).entered();

        // Content identity exists before classification, so even failure
        // entries carry a stable document id.
        let id = content_hash_id(&group.combined_text, &page_range);

        let classification = classify(&group.combined_text);
        if classification.document_type == DocumentType::Unknown {
            tracing::warn!(pages = %page_range, "document type not recognized");
            return failed(id, &page_range, "Could not determine document type".into());
        }

        let retriever = ExampleRetriever::new(self.knowledge.as_ref());
        let examples = retriever.retrieve(
            classification.document_type,
            &classification.carrier,
            self.max_few_shot_examples,
        );

        let extraction = match self.engine.extract(
            &group.combined_text,
            classification.document_type,
            &classification.carrier,
            &examples,
        ) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(pages = %page_range, error = %e, "extraction failed");
                return failed(id, &page_range, format!("Extraction failed: {e}"));
            }
        };

        let outcome = validate(&extraction.data);
        let status = derive_status(
            extraction.confidence_score,
            &outcome,
            self.auto_validate_threshold,
        );

        match db::get_document(conn, &id) {
            Ok(None) => {}
            Ok(Some(_)) => {
                tracing::warn!(doc_id = %id, pages = %page_range, "duplicate document skipped");
                return failed(id, &page_range, format!("Document already processed (id {id})"));
            }
            Err(e) => {
                tracing::error!(doc_id = %id, error = %e, "duplicate lookup failed");
                return failed(id, &page_range, format!("Persistence failed: {e}"));
            }
        }

        // Blob before record: a record must never point at a missing blob.
        let blob_name = format!("{id}.pdf");
        let document_url = match self.blob_store.put(&blob_name, &request.bytes) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(doc_id = %id, error = %e, "blob store write failed");
                return failed(id, &page_range, format!("Storage failed: {e}"));
            }
        };

        let record = self.build_record(
            id,
            &classification.carrier,
            document_url,
            request,
            group,
            total_pages as u32,
            status,
            &extraction,
            &outcome,
        );

        match db::insert_document(conn, &record) {
            Ok(()) => {}
            Err(DatabaseError::DuplicateDocument(_)) => {
                return failed(id, &page_range, format!("Document already processed (id {id})"));
            }
            Err(e) => {
                tracing::error!(doc_id = %id, error = %e, "record insert failed");
                return failed(id, &page_range, format!("Persistence failed: {e}"));
            }
        }

        tracing::info!(
            doc_id = %id,
            document_type = %record.document_type,
            status = %record.processing_status.as_str(),
            confidence = record.confidence_score,
            pages = %page_range,
            "document recorded"
        );

        if promotion_eligible(
            extraction.confidence_score,
            &outcome,
            self.min_promotion_confidence,
        ) {
            self.promote(&record, &group.combined_text);
        }

        DocumentOutcome::Processed {
            id,
            document_type: record.document_type,
            document_number: record.document_number.clone(),
            carrier: record.carrier.clone(),
            confidence_score: record.confidence_score,
            processing_status: record.processing_status,
            page_range,
            validation_warnings: outcome.warnings,
            validation_errors: outcome.errors,
            uncertain_fields: record.uncertain_fields.clone(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_record(
        &self,
        id: Uuid,
        carrier: &str,
        document_url: String,
        request: &UploadRequest,
        group: &DocumentGroup,
        total_pages: u32,
        status: ProcessingStatus,
        extraction: &crate::pipeline::extraction::ExtractionResult,
        outcome: &crate::pipeline::validation::ValidationOutcome,
    ) -> DocumentRecord {
        let (action, comment) = match status {
            ProcessingStatus::Validated => (
                ReviewAction::AutoValidated,
                format!(
                    "Auto-validated at confidence {:.2}",
                    extraction.confidence_score
                ),
            ),
            _ => (
                ReviewAction::QueuedForReview,
                review_comment(extraction.confidence_score, outcome),
            ),
        };
        let initial_event = ValidationEvent::new(id, PIPELINE_ACTOR, action, Some(&comment));

        DocumentRecord {
            id,
            document_type: extraction.data.document_type(),
            document_number: extraction.data.document_number().to_string(),
            carrier: carrier.to_string(),
            uploaded_by: request.uploaded_by.clone(),
            upload_timestamp: Utc::now(),
            processing_status: status,
            data: extraction.data.clone(),
            confidence_score: extraction.confidence_score,
            uncertain_fields: extraction.uncertain_fields.clone(),
            extraction_metadata: extraction.metadata.clone(),
            document_url,
            start_page: group.start_page,
            end_page: group.end_page,
            total_pages,
            validation_history: vec![initial_event],
        }
    }

    /// Feed a clean extraction back into the knowledge base. Best effort:
    /// a promotion failure never fails the document.
    fn promote(&self, record: &DocumentRecord, source_text: &str) {
        let example = KnowledgeBaseExample {
            id: Uuid::new_v4(),
            document_type: record.document_type,
            carrier: record.carrier.clone(),
            source_text: source_text.to_string(),
            extracted_data: example_payload(&record.data),
            confidence_score: record.confidence_score,
            validated_by: PIPELINE_ACTOR.to_string(),
            validated_date: Utc::now(),
        };

        match self.knowledge.append(&example) {
            Ok(()) => {
                tracing::info!(
                    doc_id = %record.id,
                    document_type = %record.document_type,
                    "extraction promoted to knowledge base"
                );
            }
            Err(e) => {
                tracing::warn!(doc_id = %record.id, error = %e, "knowledge promotion failed");
            }
        }
    }
}

fn failed(document_id: Uuid, page_range: &str, message: String) -> DocumentOutcome {
    DocumentOutcome::Failed {
        error: true,
        document_id,
        page_range: page_range.to_string(),
        message,
    }
}

fn page_range_label(group: &DocumentGroup) -> String {
    if group.start_page == group.end_page {
        group.start_page.to_string()
    } else {
        format!("{}-{}", group.start_page, group.end_page)
    }
}

fn review_comment(confidence: f32, outcome: &crate::pipeline::validation::ValidationOutcome) -> String {
    if outcome.errors.is_empty() {
        format!("Queued for review at confidence {confidence:.2}")
    } else {
        format!(
            "Queued for review: {} (confidence {confidence:.2})",
            outcome.errors.join("; ")
        )
    }
}

/// Deterministic document identity: the same text on the same pages is
/// the same document, whatever the upload filename.
fn content_hash_id(combined_text: &str, page_range: &str) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(combined_text.as_bytes());
    hasher.update(b"\x00");
    hasher.update(page_range.as_bytes());
    let digest = hasher.finalize();
    Uuid::new_v5(&Uuid::NAMESPACE_OID, &digest)
}

/// Strip the enum envelope so stored examples are plain field objects.
fn example_payload(data: &DocumentData) -> serde_json::Value {
    match serde_json::to_value(data) {
        Ok(mut value) => value
            .get_mut("fields")
            .map(serde_json::Value::take)
            .unwrap_or(value),
        Err(_) => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::knowledge::SqliteKnowledgeStore;
    use crate::pipeline::extraction::client::MockInferenceClient;
    use crate::storage::MockBlobStore;

    const BOOKING_PAGE: &str = "BOOKING CONFIRMATION\nMaersk Line A/S\n\
        Booking Number: MAEU12345678\nVessel: Emma Maersk Voyage: 024W\n\
        ETD: 2024-03-01 ETA: 2024-03-28\nCommodity: electronics";

    const BL_PAGE_ONE: &str = "BILL OF LADING\nMaersk Line A/S\nB/L No: MAEU99887766\n\
        Shipper: Acme Exports Ltd\nConsignee: Far East Imports Pte\n\
        Port of Loading: Rotterdam\nPort of Discharge: Singapore";

    const BL_PAGE_TWO: &str = "Container: CSQU3054383 Seal: SL998812\n\
        Gross Weight: 18,400 KGS\nShipped on Board: 2024-03-01\nNotify Party: Same as consignee";

    const BOOKING_REPLY: &str = r#"```json
{
  "data": {
    "booking_number": "MAEU12345678",
    "vessel": "Emma Maersk",
    "voyage": "024W",
    "port_of_loading": "Rotterdam",
    "port_of_discharge": "Singapore",
    "etd": "2024-03-01",
    "eta": "2024-03-28",
    "commodity": "electronics"
  },
  "confidence": 0.93,
  "uncertain_fields": []
}
```"#;

    const BL_REPLY: &str = r#"```json
{
  "data": {
    "bl_number": "MAEU99887766",
    "shipper": "Acme Exports Ltd",
    "consignee": "Far East Imports Pte",
    "port_of_loading": "Rotterdam",
    "port_of_discharge": "Singapore",
    "containers": [
      {"container_number": "CSQU3054383", "seal_number": "SL998812", "container_type": "40HC"}
    ],
    "gross_weight": "18,400 KGS",
    "shipped_on_board_date": "2024-03-01"
  },
  "confidence": 0.90,
  "uncertain_fields": ["gross_weight"]
}
```"#;

    fn request() -> UploadRequest {
        UploadRequest {
            bytes: b"%PDF-1.7 test".to_vec(),
            original_filename: "shipment.pdf".into(),
            uploaded_by: "ops@example.com".into(),
        }
    }

    fn pipeline_with(client: MockInferenceClient, pages: Vec<String>) -> DocumentPipeline {
        let engine = ExtractionEngine::new(Box::new(client), "llama3.1:8b".into());
        DocumentPipeline::new(
            Box::new(PrecomputedPages::new(pages)),
            engine,
            Box::new(MockBlobStore { fail: false }),
            Box::new(SqliteKnowledgeStore::open_in_memory().unwrap()),
        )
    }

    fn test_db() -> rusqlite::Connection {
        open_memory_database().unwrap()
    }

    #[test]
    fn single_document_upload_auto_validates() {
        let pipeline = pipeline_with(
            MockInferenceClient::replying(BOOKING_REPLY),
            vec![BOOKING_PAGE.to_string()],
        );
        let conn = test_db();

        let summary = pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        assert!(summary.succeeded());
        assert_eq!(summary.documents_found, 1);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.error_count, 0);

        match &summary.documents[0] {
            DocumentOutcome::Processed {
                id,
                document_number,
                processing_status,
                ..
            } => {
                assert_eq!(document_number, "MAEU12345678");
                assert_eq!(*processing_status, ProcessingStatus::Validated);

                let record = db::get_document(&conn, id).unwrap().unwrap();
                assert_eq!(record.uploaded_by, "ops@example.com");
                assert_eq!(record.validation_history.len(), 1);
                assert_eq!(
                    record.validation_history[0].action,
                    ReviewAction::AutoValidated
                );
            }
            other => panic!("expected Processed, got {other:?}"),
        }
    }

    #[test]
    fn multi_document_upload_processes_each_group() {
        let pipeline = pipeline_with(
            MockInferenceClient::scripted(&[BL_REPLY, BOOKING_REPLY]),
            vec![
                BL_PAGE_ONE.to_string(),
                BL_PAGE_TWO.to_string(),
                BOOKING_PAGE.to_string(),
            ],
        );
        let conn = test_db();

        let summary = pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        assert_eq!(summary.total_pages, 3);
        assert_eq!(summary.documents_found, 2);
        assert_eq!(summary.success_count, 2);

        match &summary.documents[0] {
            DocumentOutcome::Processed {
                document_type,
                page_range,
                ..
            } => {
                assert_eq!(*document_type, DocumentType::BillOfLading);
                assert_eq!(page_range, "1-2");
            }
            other => panic!("expected Processed, got {other:?}"),
        }
        match &summary.documents[1] {
            DocumentOutcome::Processed { page_range, .. } => assert_eq!(page_range, "3"),
            other => panic!("expected Processed, got {other:?}"),
        }
    }

    #[test]
    fn inference_failure_is_reported_per_group() {
        let pipeline = pipeline_with(
            MockInferenceClient::failing("connection reset"),
            vec![BOOKING_PAGE.to_string()],
        );
        let conn = test_db();

        let summary = pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        assert!(!summary.succeeded());
        assert_eq!(summary.error_count, 1);
        match &summary.documents[0] {
            DocumentOutcome::Failed { error, message, .. } => {
                assert!(*error);
                assert!(message.contains("Extraction failed"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_group_fails_without_inference() {
        let pipeline = pipeline_with(
            MockInferenceClient::replying(BOOKING_REPLY),
            vec!["completely unrelated prose about gardening".to_string()],
        );
        let conn = test_db();

        let summary = pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        assert_eq!(summary.error_count, 1);
        match &summary.documents[0] {
            DocumentOutcome::Failed { message, .. } => {
                assert!(message.contains("document type"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn reprocessing_the_same_upload_reports_duplicates() {
        let conn = test_db();
        let pages = vec![BOOKING_PAGE.to_string()];

        let first = pipeline_with(MockInferenceClient::replying(BOOKING_REPLY), pages.clone());
        assert!(first
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap()
            .succeeded());

        let second = pipeline_with(MockInferenceClient::replying(BOOKING_REPLY), pages);
        let summary = second
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        assert!(!summary.succeeded());
        match &summary.documents[0] {
            DocumentOutcome::Failed { message, .. } => {
                assert!(message.contains("already processed"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn blob_failure_leaves_no_record_behind() {
        let engine = ExtractionEngine::new(
            Box::new(MockInferenceClient::replying(BOOKING_REPLY)),
            "llama3.1:8b".into(),
        );
        let pipeline = DocumentPipeline::new(
            Box::new(PrecomputedPages::new(vec![BOOKING_PAGE.to_string()])),
            engine,
            Box::new(MockBlobStore { fail: true }),
            Box::new(SqliteKnowledgeStore::open_in_memory().unwrap()),
        );
        let conn = test_db();

        let summary = pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        assert!(!summary.succeeded());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn low_confidence_goes_pending_with_review_event() {
        let reply = r#"```json
{"data": {"booking_number": "MAEU12345678"}, "confidence": 0.55, "uncertain_fields": ["vessel"]}
```"#;
        let pipeline = pipeline_with(
            MockInferenceClient::replying(reply),
            vec![BOOKING_PAGE.to_string()],
        );
        let conn = test_db();

        let summary = pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        match &summary.documents[0] {
            DocumentOutcome::Processed {
                id,
                processing_status,
                uncertain_fields,
                ..
            } => {
                assert_eq!(*processing_status, ProcessingStatus::Pending);
                assert_eq!(uncertain_fields, &vec!["vessel".to_string()]);

                let record = db::get_document(&conn, id).unwrap().unwrap();
                assert_eq!(
                    record.validation_history[0].action,
                    ReviewAction::QueuedForReview
                );
            }
            other => panic!("expected Processed, got {other:?}"),
        }
    }

    /// In-memory store that keeps a shared handle so tests can inspect
    /// what the pipeline appended.
    #[derive(Clone, Default)]
    struct RecordingKnowledgeStore {
        appended: Arc<std::sync::Mutex<Vec<KnowledgeBaseExample>>>,
    }

    impl KnowledgeStore for RecordingKnowledgeStore {
        fn query(
            &self,
            document_type: DocumentType,
            carrier: &str,
            limit: usize,
        ) -> Result<Vec<KnowledgeBaseExample>, crate::knowledge::KnowledgeError> {
            let all = self.appended.lock().unwrap();
            Ok(all
                .iter()
                .filter(|e| {
                    e.document_type == document_type
                        && (carrier.is_empty() || e.carrier == carrier)
                })
                .take(limit)
                .cloned()
                .collect())
        }

        fn append(
            &self,
            example: &KnowledgeBaseExample,
        ) -> Result<(), crate::knowledge::KnowledgeError> {
            self.appended.lock().unwrap().push(example.clone());
            Ok(())
        }
    }

    #[test]
    fn clean_high_confidence_extraction_is_promoted() {
        let store = RecordingKnowledgeStore::default();
        let engine = ExtractionEngine::new(
            Box::new(MockInferenceClient::replying(BOOKING_REPLY)),
            "llama3.1:8b".into(),
        );
        let pipeline = DocumentPipeline::new(
            Box::new(PrecomputedPages::new(vec![BOOKING_PAGE.to_string()])),
            engine,
            Box::new(MockBlobStore { fail: false }),
            Box::new(store.clone()),
        );
        let conn = test_db();

        pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        // 0.93 confidence, no errors, no warnings: promoted
        let appended = store.appended.lock().unwrap();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].document_type, DocumentType::BookingConfirmation);
        assert_eq!(appended[0].carrier, "Maersk");
        assert_eq!(appended[0].validated_by, "pipeline");
        assert!(appended[0].extracted_data.get("booking_number").is_some());
    }

    #[test]
    fn extraction_with_warnings_is_still_promoted() {
        // An unparseable date warns but does not gate promotion
        let reply = r#"```json
{"data": {"booking_number": "MAEU12345678", "etd": "first week of March"}, "confidence": 0.93, "uncertain_fields": []}
```"#;
        let store = RecordingKnowledgeStore::default();
        let engine = ExtractionEngine::new(
            Box::new(MockInferenceClient::replying(reply)),
            "llama3.1:8b".into(),
        );
        let pipeline = DocumentPipeline::new(
            Box::new(PrecomputedPages::new(vec![BOOKING_PAGE.to_string()])),
            engine,
            Box::new(MockBlobStore { fail: false }),
            Box::new(store.clone()),
        );
        let conn = test_db();

        let summary = pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        match &summary.documents[0] {
            DocumentOutcome::Processed {
                validation_warnings,
                ..
            } => assert!(!validation_warnings.is_empty()),
            other => panic!("expected Processed, got {other:?}"),
        }
        assert_eq!(store.appended.lock().unwrap().len(), 1);
    }

    #[test]
    fn pending_extractions_are_not_promoted() {
        let reply = r#"```json
{"data": {"booking_number": "MAEU12345678"}, "confidence": 0.55, "uncertain_fields": []}
```"#;
        let store = RecordingKnowledgeStore::default();
        let engine = ExtractionEngine::new(
            Box::new(MockInferenceClient::replying(reply)),
            "llama3.1:8b".into(),
        );
        let pipeline = DocumentPipeline::new(
            Box::new(PrecomputedPages::new(vec![BOOKING_PAGE.to_string()])),
            engine,
            Box::new(MockBlobStore { fail: false }),
            Box::new(store.clone()),
        );
        let conn = test_db();

        pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        assert!(store.appended.lock().unwrap().is_empty());
    }

    #[test]
    fn cancellation_before_start_aborts_the_batch() {
        let pipeline = pipeline_with(
            MockInferenceClient::replying(BOOKING_REPLY),
            vec![BOOKING_PAGE.to_string()],
        );
        let conn = test_db();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = pipeline
            .process_upload(&request(), &conn, &cancel)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[test]
    fn empty_upload_is_a_batch_error() {
        let pipeline = pipeline_with(
            MockInferenceClient::replying(BOOKING_REPLY),
            vec!["   ".to_string(), "".to_string()],
        );
        let conn = test_db();

        let err = pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyUpload));
    }

    #[test]
    fn content_hash_id_is_deterministic_and_page_sensitive() {
        let a = content_hash_id("same text", "1-2");
        let b = content_hash_id("same text", "1-2");
        let c = content_hash_id("same text", "3");
        let d = content_hash_id("other text", "1-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn example_payload_strips_the_enum_envelope() {
        let data = DocumentData::default_booking();
        let payload = example_payload(&data);
        assert!(payload.get("booking_number").is_some());
        assert!(payload.get("kind").is_none());
    }

    #[test]
    fn summary_serializes_camel_case() {
        let summary = UploadSummary {
            message: "Processed 1 of 1 documents".into(),
            original_filename: "shipment.pdf".into(),
            total_pages: 1,
            documents_found: 1,
            success_count: 1,
            error_count: 0,
            documents: vec![failed(Uuid::nil(), "1", "boom".into())],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("originalFilename").is_some());
        assert!(json.get("successCount").is_some());
        assert!(json["documents"][0].get("pageRange").is_some());
        assert!(json["documents"][0].get("documentId").is_some());
        assert_eq!(json["documents"][0]["error"], serde_json::json!(true));
    }

    #[test]
    fn persistence_failure_is_reported_per_group() {
        let pipeline = pipeline_with(
            MockInferenceClient::scripted(&[BL_REPLY, BOOKING_REPLY]),
            vec![
                BL_PAGE_ONE.to_string(),
                BL_PAGE_TWO.to_string(),
                BOOKING_PAGE.to_string(),
            ],
        );
        let conn = test_db();
        conn.execute_batch("DROP TABLE validation_events; DROP TABLE documents;")
            .unwrap();

        let summary = pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        // Both groups ran; neither aborted the batch
        assert_eq!(summary.documents_found, 2);
        assert_eq!(summary.documents.len(), 2);
        assert_eq!(summary.error_count, 2);
        assert!(!summary.succeeded());
        for outcome in &summary.documents {
            match outcome {
                DocumentOutcome::Failed { message, .. } => {
                    assert!(message.contains("Persistence failed"));
                }
                other => panic!("expected Failed, got {other:?}"),
            }
        }
    }

    #[test]
    fn failure_entries_carry_a_document_id() {
        let pipeline = pipeline_with(
            MockInferenceClient::failing("connection reset"),
            vec![BOOKING_PAGE.to_string()],
        );
        let conn = test_db();

        let summary = pipeline
            .process_upload(&request(), &conn, &CancelFlag::new())
            .unwrap();

        match &summary.documents[0] {
            DocumentOutcome::Failed { document_id, .. } => {
                assert_ne!(*document_id, Uuid::nil());
                // Identity is content-derived, so a rerun reports the same id
                let expected = content_hash_id(BOOKING_PAGE, "1");
                assert_eq!(*document_id, expected);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
