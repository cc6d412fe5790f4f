//! Type-specific business-rule validation for extracted document data.
//!
//! Pure and infallible: the worst outcome is `valid = false` with populated
//! errors. Errors force human review; warnings ride along for the reviewer.

use chrono::NaiveDate;
use serde::Serialize;

use crate::pipeline::extraction::schema::{
    BillOfLadingData, BookingConfirmationData, DeliveryOrderData, DocumentData, TransportOrderData,
};

/// Outcome of validating one extraction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate extracted data against the rules for its document type.
pub fn validate(data: &DocumentData) -> ValidationOutcome {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match data {
        DocumentData::BookingConfirmation(d) => {
            validate_booking(d, &mut errors, &mut warnings)
        }
        DocumentData::BillOfLading(d) => validate_bill_of_lading(d, &mut errors, &mut warnings),
        DocumentData::DeliveryOrder(d) => validate_delivery_order(d, &mut errors, &mut warnings),
        DocumentData::TransportOrder(d) => {
            validate_transport_order(d, &mut errors, &mut warnings)
        }
    }

    ValidationOutcome {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn validate_booking(
    d: &BookingConfirmationData,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    require_field("booking_number", &d.booking_number, errors);
    check_reference_shape("booking_number", &d.booking_number, warnings);
    check_distinct_ports(
        d.port_of_loading.as_deref(),
        d.port_of_discharge.as_deref(),
        errors,
    );

    check_date_format("etd", d.etd.as_deref(), warnings);
    check_date_format("eta", d.eta.as_deref(), warnings);
    if let (Some(etd), Some(eta)) = (
        d.etd.as_deref().and_then(parse_flexible_date),
        d.eta.as_deref().and_then(parse_flexible_date),
    ) {
        if eta < etd {
            warnings.push(format!("eta {eta} is before etd {etd}"));
        }
    }

    if d.container_count == Some(0) {
        warnings.push("container_count is zero".into());
    }
}

fn validate_bill_of_lading(
    d: &BillOfLadingData,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    require_field("bl_number", &d.bl_number, errors);
    check_reference_shape("bl_number", &d.bl_number, warnings);
    require_present("shipper", d.shipper.as_deref(), errors);
    require_present("consignee", d.consignee.as_deref(), errors);
    check_distinct_ports(
        d.port_of_loading.as_deref(),
        d.port_of_discharge.as_deref(),
        errors,
    );

    if d.containers.is_empty() {
        errors.push("missing required container number".into());
    }
    for container in &d.containers {
        check_container_number(&container.container_number, errors, warnings);
    }

    check_date_format("shipped_on_board_date", d.shipped_on_board_date.as_deref(), warnings);
}

fn validate_delivery_order(
    d: &DeliveryOrderData,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    require_field("delivery_order_number", &d.delivery_order_number, errors);

    match d.container_number.as_deref() {
        None | Some("") => errors.push("missing required container number".into()),
        Some(number) => check_container_number(number, errors, warnings),
    }

    if d.release_to.is_none() && d.consignee.is_none() {
        warnings.push("neither release_to nor consignee present".into());
    }
    check_date_format("valid_until", d.valid_until.as_deref(), warnings);
}

fn validate_transport_order(
    d: &TransportOrderData,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    require_field("transport_order_number", &d.transport_order_number, errors);
    require_present("pickup_location", d.pickup_location.as_deref(), errors);
    require_present("delivery_location", d.delivery_location.as_deref(), errors);

    if let (Some(pickup), Some(delivery)) =
        (d.pickup_location.as_deref(), d.delivery_location.as_deref())
    {
        if !pickup.is_empty() && pickup.eq_ignore_ascii_case(delivery) {
            errors.push("pickup_location equals delivery_location".into());
        }
    }

    check_date_format("pickup_date", d.pickup_date.as_deref(), warnings);
    check_date_format("delivery_date", d.delivery_date.as_deref(), warnings);

    if let Some(number) = d.container_number.as_deref() {
        check_container_number(number, errors, warnings);
    }
}

// ── Shared checks ───────────────────────────────────────────────────────

fn require_field(name: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("missing required field: {name}"));
    }
}

fn require_present(name: &str, value: Option<&str>, errors: &mut Vec<String>) {
    if value.map(str::trim).filter(|v| !v.is_empty()).is_none() {
        errors.push(format!("missing required field: {name}"));
    }
}

/// Booking and B/L references are dense alphanumeric tokens. A very short
/// value or embedded whitespace usually means the model grabbed a label.
fn check_reference_shape(field: &str, value: &str, warnings: &mut Vec<String>) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return; // already an error from require_field
    }
    if trimmed.len() < 6 || trimmed.chars().any(char::is_whitespace) {
        warnings.push(format!("suspicious {field} shape: '{trimmed}'"));
    }
}

fn check_distinct_ports(loading: Option<&str>, discharge: Option<&str>, errors: &mut Vec<String>) {
    if let (Some(pol), Some(pod)) = (loading, discharge) {
        if !pol.trim().is_empty() && pol.trim().eq_ignore_ascii_case(pod.trim()) {
            errors.push("port_of_loading equals port_of_discharge".into());
        }
    }
}

fn check_date_format(field: &str, value: Option<&str>, warnings: &mut Vec<String>) {
    if let Some(raw) = value {
        if !raw.trim().is_empty() && parse_flexible_date(raw).is_none() {
            warnings.push(format!("unparseable date in {field}: '{raw}'"));
        }
    }
}

/// Parse the date formats carriers actually print.
/// Supports ISO 8601, European DD/MM/YYYY and DD-MM-YYYY, and US MM/DD/YYYY.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y", "%d %b %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(d);
        }
    }
    None
}

/// ISO 6346: owner code (3 letters) + category (1 letter) + 6 digits + check digit.
/// A malformed shape is an error; a failing check digit is only a warning,
/// since OCR-mangled digits are common and reviewable.
fn check_container_number(number: &str, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let trimmed = number.trim();
    let bytes = trimmed.as_bytes();

    let shape_ok = bytes.len() == 11
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4..].iter().all(u8::is_ascii_digit);

    if !shape_ok {
        errors.push(format!("invalid container number format: '{trimmed}'"));
        return;
    }

    if let Some(expected) = iso6346_check_digit(&trimmed[..10]) {
        let actual = (bytes[10] - b'0') as u32;
        if expected != actual {
            warnings.push(format!(
                "container number '{trimmed}' fails check digit (expected {expected})"
            ));
        }
    }
}

/// ISO 6346 letter values: A=10 onward, skipping the multiples of 11
/// (11, 22, 33), so B=12, L=23, V=34.
const ISO6346_LETTER_VALUES: [u32; 26] = [
    10, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 34, 35,
    36, 37, 38,
];

/// Compute the ISO 6346 check digit for the first 10 characters.
fn iso6346_check_digit(prefix: &str) -> Option<u32> {
    if prefix.len() != 10 {
        return None;
    }

    let mut sum: u64 = 0;
    for (position, ch) in prefix.chars().enumerate() {
        let value = match ch {
            '0'..='9' => ch as u32 - '0' as u32,
            'A'..='Z' => ISO6346_LETTER_VALUES[(ch as u32 - 'A' as u32) as usize],
            _ => return None,
        };
        sum += (value as u64) << position; // value * 2^position
    }

    Some((sum % 11 % 10) as u32)
}
