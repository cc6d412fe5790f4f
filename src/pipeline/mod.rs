//! Document processing pipeline: segment, classify, extract, validate, route.
//!
//! One upload produces one [`orchestrator::UploadSummary`] covering every
//! document group found in it. Groups fail independently; a single bad
//! group never aborts the batch.

pub mod classify;
pub mod extraction;
pub mod orchestrator;
pub mod router;
pub mod segmenter;
pub mod validation;

pub use orchestrator::{
    CancelFlag, DocumentOutcome, DocumentPipeline, PageTextProvider, UploadRequest, UploadSummary,
};

use thiserror::Error;

/// Batch-level failures. Everything per-group, persistence included, is
/// reported inside the summary instead, so the rest of the batch can
/// proceed.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("could not read pages from upload: {0}")]
    PageExtraction(String),

    #[error("upload contains no extractable text")]
    EmptyUpload,

    #[error("upload cancelled")]
    Cancelled,
}
