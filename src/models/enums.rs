use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(DocumentType {
    BookingConfirmation => "booking_confirmation",
    BillOfLading => "bill_of_lading",
    DeliveryOrder => "delivery_order",
    TransportOrder => "transport_order",
    Unknown => "unknown",
});

str_enum!(ProcessingStatus {
    Pending => "pending",
    Validated => "validated",
    Rejected => "rejected",
});

str_enum!(ReviewAction {
    AutoValidated => "auto_validated",
    QueuedForReview => "queued_for_review",
    Validated => "validated",
    Rejected => "rejected",
    Commented => "commented",
});
