//! Typed payload schemas for each shipping document kind.
//!
//! One struct per document type, joined in the closed `DocumentData` union.
//! Mandatory fields are plain `String`s — a model response missing them fails
//! schema coercion instead of producing a hollow record.

use serde::{Deserialize, Serialize};

use crate::models::enums::DocumentType;

/// Container line on a bill of lading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerDetail {
    pub container_number: String,
    #[serde(default)]
    pub seal_number: Option<String>,
    #[serde(default)]
    pub container_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingConfirmationData {
    pub booking_number: String,
    #[serde(default)]
    pub vessel: Option<String>,
    #[serde(default)]
    pub voyage: Option<String>,
    #[serde(default)]
    pub port_of_loading: Option<String>,
    #[serde(default)]
    pub port_of_discharge: Option<String>,
    #[serde(default)]
    pub etd: Option<String>,
    #[serde(default)]
    pub eta: Option<String>,
    #[serde(default)]
    pub container_type: Option<String>,
    #[serde(default)]
    pub container_count: Option<u32>,
    #[serde(default)]
    pub commodity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillOfLadingData {
    pub bl_number: String,
    #[serde(default)]
    pub shipper: Option<String>,
    #[serde(default)]
    pub consignee: Option<String>,
    #[serde(default)]
    pub notify_party: Option<String>,
    #[serde(default)]
    pub vessel: Option<String>,
    #[serde(default)]
    pub voyage: Option<String>,
    #[serde(default)]
    pub port_of_loading: Option<String>,
    #[serde(default)]
    pub port_of_discharge: Option<String>,
    #[serde(default)]
    pub containers: Vec<ContainerDetail>,
    #[serde(default)]
    pub goods_description: Option<String>,
    #[serde(default)]
    pub gross_weight: Option<String>,
    #[serde(default)]
    pub shipped_on_board_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryOrderData {
    pub delivery_order_number: String,
    #[serde(default)]
    pub bl_reference: Option<String>,
    #[serde(default)]
    pub consignee: Option<String>,
    #[serde(default)]
    pub release_to: Option<String>,
    #[serde(default)]
    pub container_number: Option<String>,
    #[serde(default)]
    pub pickup_terminal: Option<String>,
    #[serde(default)]
    pub empty_return_depot: Option<String>,
    #[serde(default)]
    pub valid_until: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportOrderData {
    pub transport_order_number: String,
    #[serde(default)]
    pub customer_reference: Option<String>,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub delivery_location: Option<String>,
    #[serde(default)]
    pub pickup_date: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub container_number: Option<String>,
    #[serde(default)]
    pub haulier: Option<String>,
}

/// Closed union over the extractable document kinds.
///
/// Resolved by pattern matching everywhere — there is no runtime property
/// lookup, and `DocumentType::Unknown` deliberately has no payload variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum DocumentData {
    BookingConfirmation(BookingConfirmationData),
    BillOfLading(BillOfLadingData),
    DeliveryOrder(DeliveryOrderData),
    TransportOrder(TransportOrderData),
}

impl DocumentData {
    pub fn document_type(&self) -> DocumentType {
        match self {
            Self::BookingConfirmation(_) => DocumentType::BookingConfirmation,
            Self::BillOfLading(_) => DocumentType::BillOfLading,
            Self::DeliveryOrder(_) => DocumentType::DeliveryOrder,
            Self::TransportOrder(_) => DocumentType::TransportOrder,
        }
    }

    /// The primary reference number carried by this document.
    pub fn document_number(&self) -> &str {
        match self {
            Self::BookingConfirmation(d) => &d.booking_number,
            Self::BillOfLading(d) => &d.bl_number,
            Self::DeliveryOrder(d) => &d.delivery_order_number,
            Self::TransportOrder(d) => &d.transport_order_number,
        }
    }

    /// Empty booking payload; handy for tests and placeholder records.
    pub fn default_booking() -> Self {
        Self::BookingConfirmation(BookingConfirmationData::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_number_per_variant() {
        let booking = DocumentData::BookingConfirmation(BookingConfirmationData {
            booking_number: "MAEU987654321".into(),
            ..Default::default()
        });
        assert_eq!(booking.document_number(), "MAEU987654321");
        assert_eq!(booking.document_type(), DocumentType::BookingConfirmation);

        let bl = DocumentData::BillOfLading(BillOfLadingData {
            bl_number: "MEDUX1234567".into(),
            ..Default::default()
        });
        assert_eq!(bl.document_number(), "MEDUX1234567");
        assert_eq!(bl.document_type(), DocumentType::BillOfLading);
    }

    #[test]
    fn missing_mandatory_key_fails_deserialization() {
        // No booking_number — must not deserialize into the schema
        let value = serde_json::json!({"vessel": "EMMA MAERSK"});
        let result: Result<BookingConfirmationData, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn optional_fields_default_when_absent() {
        let value = serde_json::json!({"bl_number": "HLCUHAM1234567"});
        let data: BillOfLadingData = serde_json::from_value(value).unwrap();
        assert_eq!(data.bl_number, "HLCUHAM1234567");
        assert!(data.shipper.is_none());
        assert!(data.containers.is_empty());
    }

    #[test]
    fn tagged_union_round_trips() {
        let data = DocumentData::DeliveryOrder(DeliveryOrderData {
            delivery_order_number: "DO-2024-0042".into(),
            container_number: Some("MSKU1234565".into()),
            ..Default::default()
        });
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"delivery_order\""));
        let back: DocumentData = serde_json::from_str(&json).unwrap();
        assert_eq!(back.document_number(), "DO-2024-0042");
    }
}
