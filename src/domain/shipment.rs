use crate::domain::quote::{Address, CreateShipmentRequest, Quote};
use crate::domain::tracking::TrackingEvent;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CARRIER_NAME: &str = "ANDREANI";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Pending,
    QuoteRequested,
    Quoted,
    Created,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    FailedDelivery,
    Returned,
    Cancelled,
    Error,
}

impl ShipmentStatus {
    /// Statuses the periodic updater polls the carrier for.
    pub const ACTIVE: [ShipmentStatus; 4] = [
        ShipmentStatus::Created,
        ShipmentStatus::PickedUp,
        ShipmentStatus::InTransit,
        ShipmentStatus::OutForDelivery,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    /// Only shipments not yet handed to the carrier network can be cancelled.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, ShipmentStatus::Pending | ShipmentStatus::Created)
    }

    /// Maps the carrier's status vocabulary (Spanish or English, any case)
    /// to the internal enum. Unrecognized statuses read as in-transit.
    pub fn from_carrier(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "entregado" | "delivered" => ShipmentStatus::Delivered,
            "en reparto" | "out_for_delivery" => ShipmentStatus::OutForDelivery,
            "en transito" | "in_transit" => ShipmentStatus::InTransit,
            "retirado" | "picked_up" => ShipmentStatus::PickedUp,
            "devuelto" | "returned" => ShipmentStatus::Returned,
            _ => ShipmentStatus::InTransit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A shipment order and its lifecycle state.
///
/// Identity is the generated id; `order_code` is the caller's unique business
/// key and `tracking_number`, once assigned by the carrier, is immutable.
/// Shipments are never deleted, only terminally marked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: Uuid,
    pub order_code: String,
    pub tracking_number: Option<String>,
    pub carrier: String,
    pub service_type: String,
    pub status: ShipmentStatus,
    pub shipping_address: Address,
    pub recipient: Recipient,
    pub declared_value: Option<Decimal>,
    pub weight_kg: Decimal,
    pub shipping_cost: Option<Decimal>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Opaque carrier-specific metadata.
    pub carrier_data: Option<serde_json::Value>,
}

impl Shipment {
    /// Builds a fresh PENDING shipment from a creation request.
    pub fn new(request: &CreateShipmentRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_code: request.order_code.clone(),
            tracking_number: None,
            carrier: CARRIER_NAME.to_string(),
            service_type: request.service_type.clone(),
            status: ShipmentStatus::Pending,
            shipping_address: request.shipping_address.clone(),
            recipient: Recipient {
                name: request.recipient_name.clone(),
                email: request.recipient_email.clone(),
                phone: request.recipient_phone.clone(),
            },
            declared_value: request.declared_value,
            weight_kg: request.weight_kg,
            shipping_cost: None,
            estimated_delivery_date: None,
            actual_delivery_date: None,
            created_at: now,
            updated_at: now,
            carrier_data: None,
        }
    }

    /// Records the carrier-assigned tracking number and moves to CREATED.
    /// An already-assigned tracking number is never overwritten.
    pub fn mark_created(&mut self, tracking_number: String, now: DateTime<Utc>) {
        if self.tracking_number.is_none() {
            self.tracking_number = Some(tracking_number);
        }
        self.status = ShipmentStatus::Created;
        self.updated_at = now;
    }

    /// Carrier order creation failed; the shipment stays without a tracking
    /// number and is terminally marked.
    pub fn mark_error(&mut self, now: DateTime<Utc>) {
        self.status = ShipmentStatus::Error;
        self.updated_at = now;
    }

    /// Backfills cost and delivery estimate from an accepted quote.
    pub fn apply_quote(&mut self, quote: &Quote, now: DateTime<Utc>) {
        self.shipping_cost = Some(quote.price);
        self.estimated_delivery_date = Some(now + Duration::days(i64::from(quote.estimated_days)));
        self.updated_at = now;
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> bool {
        if !self.status.is_cancellable() {
            return false;
        }
        self.status = ShipmentStatus::Cancelled;
        self.updated_at = now;
        true
    }

    /// Re-evaluates the status from a carrier tracking event.
    ///
    /// Returns true when the mapped status differs from the current one (the
    /// caller persists only then). The mapping is not monotonic: a stray late
    /// event can regress the status. The actual-delivery timestamp however is
    /// written once and never rewritten.
    pub fn apply_carrier_status(&mut self, carrier_status: &str, now: DateTime<Utc>) -> bool {
        let new_status = ShipmentStatus::from_carrier(carrier_status);
        if new_status == self.status {
            return false;
        }
        self.status = new_status;
        if new_status == ShipmentStatus::Delivered && self.actual_delivery_date.is_none() {
            self.actual_delivery_date = Some(now);
        }
        self.updated_at = now;
        true
    }
}

/// A shipment together with its tracking history, newest event first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentView {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub tracking_events: Vec<TrackingEvent>,
}
