//! Freightdesk: structured extraction for shipping documents.
//!
//! Takes an uploaded multi-document PDF's page texts, splits them into
//! logical documents, classifies each one, extracts typed data through an
//! LLM with few-shot examples from a knowledge base, validates the result
//! against freight business rules, and routes it to a processing status
//! with a full audit trail.

pub mod config;
pub mod db;
pub mod knowledge;
pub mod models;
pub mod pipeline;
pub mod storage;
