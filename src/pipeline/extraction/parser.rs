use serde::Deserialize;

use super::schema::{
    BillOfLadingData, BookingConfirmationData, DeliveryOrderData, DocumentData, TransportOrderData,
};
use super::ExtractionError;
use crate::models::DocumentType;

/// The envelope the model is instructed to return.
#[derive(Debug, Deserialize)]
pub struct RawExtractionResponse {
    pub data: serde_json::Value,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub uncertain_fields: Option<Vec<String>>,
}

/// Parse the model's reply into typed document data.
pub fn parse_extraction_response(
    response: &str,
    document_type: DocumentType,
) -> Result<(DocumentData, f32, Vec<String>), ExtractionError> {
    let json_str = extract_json_block(response)?;
    let raw: RawExtractionResponse = serde_json::from_str(&json_str)?;

    let data = coerce_data(raw.data, document_type)?;
    let confidence = raw.confidence.unwrap_or(0.0).clamp(0.0, 1.0);
    let uncertain_fields = raw.uncertain_fields.unwrap_or_default();

    Ok((data, confidence, uncertain_fields))
}

/// Extract the ```json fenced block from the model's reply.
///
/// Falls back to treating the whole reply as JSON when no fences are
/// present but the text starts with a brace, since some models skip
/// fences despite instruction.
fn extract_json_block(response: &str) -> Result<String, ExtractionError> {
    if let Some(fence_start) = response.find("```json") {
        let content_start = fence_start + 7;
        let fence_end = response[content_start..]
            .find("```")
            .ok_or(ExtractionError::MalformedResponse)?;
        return Ok(response[content_start..content_start + fence_end]
            .trim()
            .to_string());
    }

    let trimmed = response.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed.to_string());
    }

    Err(ExtractionError::MalformedResponse)
}

/// Coerce the untyped "data" object into the schema for the classified type.
fn coerce_data(
    value: serde_json::Value,
    document_type: DocumentType,
) -> Result<DocumentData, ExtractionError> {
    let mismatch = |e: serde_json::Error| ExtractionError::SchemaMismatch {
        document_type: document_type.as_str().to_string(),
        reason: e.to_string(),
    };

    match document_type {
        DocumentType::BookingConfirmation => {
            let data: BookingConfirmationData = serde_json::from_value(value).map_err(mismatch)?;
            Ok(DocumentData::BookingConfirmation(data))
        }
        DocumentType::BillOfLading => {
            let data: BillOfLadingData = serde_json::from_value(value).map_err(mismatch)?;
            Ok(DocumentData::BillOfLading(data))
        }
        DocumentType::DeliveryOrder => {
            let data: DeliveryOrderData = serde_json::from_value(value).map_err(mismatch)?;
            Ok(DocumentData::DeliveryOrder(data))
        }
        DocumentType::TransportOrder => {
            let data: TransportOrderData = serde_json::from_value(value).map_err(mismatch)?;
            Ok(DocumentData::TransportOrder(data))
        }
        DocumentType::Unknown => Err(ExtractionError::UnsupportedType),
    }
}
