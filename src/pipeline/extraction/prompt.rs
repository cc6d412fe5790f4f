use crate::models::{DocumentType, KnowledgeBaseExample};

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"
You are a shipping document extraction assistant. Your ONLY role is to convert
raw freight document text into a structured format. You extract and organize
information that is explicitly present in the document.

RULES — ABSOLUTE, NO EXCEPTIONS:
1. Extract ONLY information explicitly stated in the document.
2. NEVER infer values that are not directly written.
3. If a field is unclear or missing, output null for that field.
4. Preserve reference numbers, container numbers, dates and weights verbatim.
5. Dates should be normalized to YYYY-MM-DD when the format is unambiguous,
   otherwise kept verbatim.
6. Output MUST be a single JSON block wrapped in ```json``` fences.
7. Report an overall confidence between 0.0 and 1.0, and list the names of
   fields you are uncertain about in "uncertain_fields".
"#;

/// JSON skeletons shown to the model, one per document type.
fn schema_skeleton(document_type: DocumentType) -> &'static str {
    match document_type {
        DocumentType::BookingConfirmation => {
            r#"{
  "booking_number": "reference, required",
  "vessel": "vessel name or null",
  "voyage": "voyage code or null",
  "port_of_loading": "port or null",
  "port_of_discharge": "port or null",
  "etd": "YYYY-MM-DD or null",
  "eta": "YYYY-MM-DD or null",
  "container_type": "e.g. 40HC or null",
  "container_count": 0,
  "commodity": "goods description or null"
}"#
        }
        DocumentType::BillOfLading => {
            r#"{
  "bl_number": "reference, required",
  "shipper": "party or null",
  "consignee": "party or null",
  "notify_party": "party or null",
  "vessel": "vessel name or null",
  "voyage": "voyage code or null",
  "port_of_loading": "port or null",
  "port_of_discharge": "port or null",
  "containers": [
    {"container_number": "ABCU1234567", "seal_number": "seal or null", "container_type": "40HC or null"}
  ],
  "goods_description": "description or null",
  "gross_weight": "weight with unit or null",
  "shipped_on_board_date": "YYYY-MM-DD or null"
}"#
        }
        DocumentType::DeliveryOrder => {
            r#"{
  "delivery_order_number": "reference, required",
  "bl_reference": "related B/L number or null",
  "consignee": "party or null",
  "release_to": "party or null",
  "container_number": "ABCU1234567 or null",
  "pickup_terminal": "terminal or null",
  "empty_return_depot": "depot or null",
  "valid_until": "YYYY-MM-DD or null"
}"#
        }
        DocumentType::TransportOrder => {
            r#"{
  "transport_order_number": "reference, required",
  "customer_reference": "reference or null",
  "pickup_location": "location or null",
  "delivery_location": "location or null",
  "pickup_date": "YYYY-MM-DD or null",
  "delivery_date": "YYYY-MM-DD or null",
  "container_number": "ABCU1234567 or null",
  "haulier": "carrier performing the haulage or null"
}"#
        }
        DocumentType::Unknown => "{}",
    }
}

/// Build the extraction prompt for one segmented document.
///
/// Few-shot examples come first so the model sees validated output shapes
/// before the document under extraction.
pub fn build_extraction_prompt(
    raw_text: &str,
    document_type: DocumentType,
    carrier: &str,
    examples: &[KnowledgeBaseExample],
) -> String {
    let mut prompt = String::new();

    if !examples.is_empty() {
        prompt.push_str(
            "Previously validated extractions from similar documents, for reference:\n\n",
        );
        for (index, example) in examples.iter().enumerate() {
            let extracted = serde_json::to_string_pretty(&example.extracted_data)
                .unwrap_or_else(|_| "{}".to_string());
            prompt.push_str(&format!(
                "EXAMPLE {} (carrier: {}):\n<document>\n{}\n</document>\n```json\n{}\n```\n\n",
                index + 1,
                example.carrier,
                example.source_text,
                extracted,
            ));
        }
    }

    prompt.push_str(&format!(
        r#"<document>
{raw_text}
</document>

The above document is a {document_type} from carrier "{carrier}".
Extract its data into this exact JSON structure. For any field not present
in the document, use null.

```json
{{
  "data": {skeleton},
  "confidence": 0.0,
  "uncertain_fields": ["field_name"]
}}
```"#,
        document_type = document_type.as_str(),
        skeleton = schema_skeleton(document_type),
    ));

    prompt
}
