//! CLI entry point: process one uploaded document against the local
//! database and knowledge base, printing the batch summary as JSON.
//!
//! Usage: freightdesk <document.pdf> <pages.json>
//!
//! `pages.json` holds the per-page text of the PDF as a JSON array of
//! strings, produced by an external text-extraction step.

use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use freightdesk::config::{default_log_filter, PipelineConfig};
use freightdesk::db::open_database;
use freightdesk::knowledge::SqliteKnowledgeStore;
use freightdesk::pipeline::extraction::{ExtractionEngine, HttpInferenceClient};
use freightdesk::pipeline::{CancelFlag, DocumentPipeline, PipelineError, UploadRequest};
use freightdesk::pipeline::orchestrator::PrecomputedPages;
use freightdesk::storage::FsBlobStore;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .init();

    match run() {
        Ok(succeeded) => {
            if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "upload processing aborted");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: freightdesk <document.pdf> <pages.json>");
        return Ok(false);
    }
    let document_path = Path::new(&args[1]);
    let pages_path = Path::new(&args[2]);

    let config = PipelineConfig::from_env()?;

    let bytes = std::fs::read(document_path)?;
    let pages = read_pages(pages_path)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = open_database(&config.database_path)?;

    let client = HttpInferenceClient::new(
        &config.inference_base_url,
        config.inference_api_key.clone(),
        config.inference_timeout_secs,
    )?;
    let engine = ExtractionEngine::new(Box::new(client), config.inference_model.clone());
    let blob_store = FsBlobStore::new(&config.documents_dir)?;
    let knowledge = SqliteKnowledgeStore::open(&config.knowledge_db_path)?;

    let pipeline = DocumentPipeline::new(
        Box::new(PrecomputedPages::new(pages)),
        engine,
        Box::new(blob_store),
        Box::new(knowledge),
    )
    .with_thresholds(
        config.auto_validate_threshold,
        config.min_promotion_confidence,
        config.max_few_shot_examples,
    );

    let request = UploadRequest {
        bytes,
        original_filename: document_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string()),
        uploaded_by: std::env::var("USER").unwrap_or_else(|_| "cli".to_string()),
    };

    let summary = pipeline.process_upload(&request, &conn, &CancelFlag::new())?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(summary.succeeded())
}

fn read_pages(path: &Path) -> Result<Vec<String>, PipelineError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::PageExtraction(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| PipelineError::PageExtraction(format!("{}: {e}", path.display())))
}
