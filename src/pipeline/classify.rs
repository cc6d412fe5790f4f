//! Keyword-density document classification.
//!
//! Pure functions: no I/O, no inference call. The worst case is
//! `DocumentType::Unknown` at confidence 0, never an error.

use serde::Serialize;

use crate::models::enums::DocumentType;

/// Carrier name used when no identity pattern matches.
pub const UNKNOWN_CARRIER: &str = "unknown";

/// Minimum normalized keyword-match density for a type to win.
const MIN_MATCH_DENSITY: f32 = 0.2;

/// Classification of one document group's combined text.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub document_type: DocumentType,
    pub carrier: String,
    pub confidence: f32,
    pub matched_keywords: Vec<String>,
}

const BOOKING_KEYWORDS: &[&str] = &[
    "booking confirmation",
    "booking number",
    "booking no",
    "vessel",
    "voyage",
    "etd",
    "eta",
    "equipment type",
    "place of receipt",
    "commodity",
];

const BILL_OF_LADING_KEYWORDS: &[&str] = &[
    "bill of lading",
    "b/l no",
    "shipper",
    "consignee",
    "notify party",
    "port of loading",
    "port of discharge",
    "shipped on board",
    "freight prepaid",
    "gross weight",
];

const DELIVERY_ORDER_KEYWORDS: &[&str] = &[
    "delivery order",
    "cargo release",
    "empty return",
    "pickup",
    "terminal",
    "depot",
    "valid until",
    "release to",
    "consignee",
    "demurrage",
];

const TRANSPORT_ORDER_KEYWORDS: &[&str] = &[
    "transport order",
    "haulage",
    "trucking",
    "pickup date",
    "delivery date",
    "haulier",
    "chassis",
    "loading reference",
    "collection address",
    "drop-off",
];

/// (canonical carrier name, lowercase identity substrings)
const CARRIER_PATTERNS: &[(&str, &[&str])] = &[
    ("Maersk", &["maersk"]),
    ("MSC", &["mediterranean shipping", "msc"]),
    ("CMA CGM", &["cma cgm"]),
    ("Hapag-Lloyd", &["hapag-lloyd", "hapag lloyd"]),
    ("ONE", &["ocean network express"]),
    ("Evergreen", &["evergreen"]),
    ("COSCO", &["cosco"]),
    ("HMM", &["hyundai merchant"]),
    ("Yang Ming", &["yang ming"]),
    ("ZIM", &["zim integrated"]),
];

fn keyword_sets() -> [(DocumentType, &'static [&'static str]); 4] {
    [
        (DocumentType::BookingConfirmation, BOOKING_KEYWORDS),
        (DocumentType::BillOfLading, BILL_OF_LADING_KEYWORDS),
        (DocumentType::DeliveryOrder, DELIVERY_ORDER_KEYWORDS),
        (DocumentType::TransportOrder, TRANSPORT_ORDER_KEYWORDS),
    ]
}

/// Classify one document group's combined text.
///
/// The type with the highest keyword-match density above the minimum
/// threshold wins; a tie for first place means the signal is too ambiguous
/// and yields `Unknown`.
pub fn classify(combined_text: &str) -> Classification {
    let lower = combined_text.to_lowercase();

    let mut scored: Vec<(DocumentType, f32, Vec<String>)> = keyword_sets()
        .iter()
        .map(|(doc_type, keywords)| {
            let matched: Vec<String> = keywords
                .iter()
                .filter(|k| lower.contains(**k))
                .map(|k| k.to_string())
                .collect();
            let density = matched.len() as f32 / keywords.len() as f32;
            (*doc_type, density, matched)
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best_type, best_density, matched_keywords) = scored.remove(0);
    let runner_up_density = scored[0].1;

    if best_density < MIN_MATCH_DENSITY || (best_density - runner_up_density).abs() < f32::EPSILON {
        return Classification {
            document_type: DocumentType::Unknown,
            carrier: detect_carrier(&lower),
            confidence: 0.0,
            matched_keywords: Vec::new(),
        };
    }

    Classification {
        document_type: best_type,
        carrier: detect_carrier(&lower),
        confidence: best_density.clamp(0.0, 1.0),
        matched_keywords,
    }
}

/// Match carrier identity substrings against lowercased text.
fn detect_carrier(lower_text: &str) -> String {
    for (canonical, patterns) in CARRIER_PATTERNS {
        if patterns.iter().any(|p| lower_text.contains(p)) {
            return (*canonical).to_string();
        }
    }
    UNKNOWN_CARRIER.to_string()
}
