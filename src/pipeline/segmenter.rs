//! Page grouping: split an uploaded PDF's page texts into logical documents.
//!
//! Boundary detection is a keyword/header heuristic and approximate by
//! design. Under-segmentation only grows one document's combined text;
//! over-segmentation discards context mid-document, so ambiguity resolves
//! toward keeping pages together.

use regex::Regex;

/// A contiguous page range judged to be one logical source document.
/// Pages are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentGroup {
    pub start_page: u32,
    pub end_page: u32,
    pub combined_text: String,
}

/// A recognized document-start header on a page: which pattern fired and the
/// reference number it captured, if any. Two signals with the same kind and
/// reference belong to the same document (carriers repeat headers on
/// continuation pages).
#[derive(Debug, Clone, PartialEq)]
struct StartSignal {
    kind: usize,
    reference: Option<String>,
}

/// Configurable document-start patterns. Each entry is a header regex plus an
/// optional reference-capture regex evaluated on the same page.
pub struct SegmenterConfig {
    headers: Vec<Regex>,
    reference: Regex,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        let headers = [
            r"(?i)\bbooking\s+confirmation\b",
            r"(?i)\bbill\s+of\s+lading\b|\bB/L\b",
            r"(?i)\bdelivery\s+order\b",
            r"(?i)\btransport\s+order\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static segmenter pattern"))
        .collect();

        // Booking / BL / order reference shapes: an upper-case+digit token of
        // at least 6 chars following a "no / number / ref" label.
        let reference = Regex::new(
            r"(?i)(?:booking|b/l|bl|d/o|order|our)\s*(?:no|number|ref|reference)\.?\s*[:#]?\s*([A-Z0-9][A-Z0-9/-]{5,})",
        )
        .expect("static reference pattern");

        Self { headers, reference }
    }
}

impl SegmenterConfig {
    fn detect_signal(&self, page_text: &str) -> Option<StartSignal> {
        let kind = self
            .headers
            .iter()
            .position(|header| header.is_match(page_text))?;

        let reference = self
            .reference
            .captures(page_text)
            .map(|c| c[1].to_uppercase());

        Some(StartSignal { kind, reference })
    }
}

/// Group consecutive pages into logical documents.
///
/// Always returns at least one group, and the groups partition `1..=N`
/// exactly: no gaps, no overlaps.
pub fn segment_pages(pages: &[String], config: &SegmenterConfig) -> Vec<DocumentGroup> {
    if pages.is_empty() {
        return Vec::new();
    }

    struct OpenGroup {
        start_page: u32,
        signal: Option<StartSignal>,
        text: String,
    }

    let mut groups: Vec<DocumentGroup> = Vec::new();
    let mut open: Option<OpenGroup> = None;

    for (index, page) in pages.iter().enumerate() {
        let page_number = index as u32 + 1;
        let signal = config.detect_signal(page);

        let starts_new = match (&open, &signal) {
            (None, _) => true,
            // Signal-less pages always append to the open group
            (Some(_), None) => false,
            // A signal only opens a new group when it differs from the open
            // group's signal; a signal-less open group adopts it instead
            (Some(group), Some(sig)) => match &group.signal {
                None => false,
                Some(current) => current != sig,
            },
        };

        if starts_new {
            if let Some(group) = open.take() {
                groups.push(DocumentGroup {
                    start_page: group.start_page,
                    end_page: page_number - 1,
                    combined_text: group.text,
                });
            }
            open = Some(OpenGroup {
                start_page: page_number,
                signal,
                text: page.clone(),
            });
        } else if let Some(group) = open.as_mut() {
            if group.signal.is_none() {
                group.signal = signal;
            }
            group.text.push('\n');
            group.text.push_str(page);
        }
    }

    if let Some(group) = open {
        groups.push(DocumentGroup {
            start_page: group.start_page,
            end_page: pages.len() as u32,
            combined_text: group.text,
        });
    }

    tracing::debug!(pages = pages.len(), groups = groups.len(), "Segmentation complete");
    groups
}
