use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Structured shipping address.
///
/// Structured at the boundary (request parsing, carrier payloads), treated as
/// an opaque value everywhere else: it travels with the shipment and is
/// persisted as a structured document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub street_number: String,
    #[serde(default)]
    pub apartment: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    #[serde(default)]
    pub additional_info: Option<String>,
}

/// A quote request: where from, where to, and what the package weighs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub origin_address: Address,
    pub destination_address: Address,
    #[serde(default = "default_weight")]
    pub weight_kg: Decimal,
    #[serde(default)]
    pub declared_value: Option<Decimal>,
}

/// Request to create a shipment order, keyed by the caller's order code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentRequest {
    pub order_code: String,
    pub shipping_address: Address,
    pub recipient_name: String,
    pub recipient_email: String,
    #[serde(default)]
    pub recipient_phone: Option<String>,
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default)]
    pub declared_value: Option<Decimal>,
    #[serde(default = "default_weight")]
    pub weight_kg: Decimal,
}

/// A carrier tariff option. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub carrier: String,
    pub service_type: String,
    pub service_name: String,
    pub price: Decimal,
    pub estimated_days: u32,
    pub description: String,
}

fn default_service_type() -> String {
    "STANDARD".to_string()
}

fn default_weight() -> Decimal {
    Decimal::ONE
}
