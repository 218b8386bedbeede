use super::quote::{CreateShipmentRequest, Quote, QuoteRequest};
use super::shipment::{Shipment, ShipmentStatus};
use super::tracking::{CarrierEvent, TrackingEvent};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Shared handles: the service and the periodic updater both hold the same
/// store and carrier instances.
pub type ShipmentStoreRef = Arc<dyn ShipmentStore>;
pub type TrackingEventStoreRef = Arc<dyn TrackingEventStore>;
pub type CarrierRef = Arc<dyn CarrierClient>;

#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Inserts or updates a shipment. Order code and tracking number are
    /// unique across shipments; a save that would alias another shipment's
    /// key fails.
    async fn save(&self, shipment: Shipment) -> Result<()>;
    async fn by_order_code(&self, order_code: &str) -> Result<Option<Shipment>>;
    async fn by_tracking_number(&self, tracking_number: &str) -> Result<Option<Shipment>>;
    async fn by_status(&self, statuses: &[ShipmentStatus]) -> Result<Vec<Shipment>>;
    async fn by_recipient_email(&self, email: &str) -> Result<Vec<Shipment>>;
}

#[async_trait]
pub trait TrackingEventStore: Send + Sync {
    async fn append(&self, event: TrackingEvent) -> Result<()>;
    /// All events for a shipment, newest first by event date.
    async fn for_shipment(&self, shipment_id: Uuid) -> Result<Vec<TrackingEvent>>;
}

/// The carrier capability set, implemented by both the real Andreani client
/// and the mock.
///
/// Only authentication surfaces an error; the other operations define their
/// own safe fallbacks (default quote, `None` tracking number, empty event
/// list) so callers never hard-fail on carrier trouble.
#[async_trait]
pub trait CarrierClient: Send + Sync {
    async fn authenticate(&self) -> Result<String>;
    async fn quotes(&self, request: &QuoteRequest) -> Vec<Quote>;
    async fn create_order(
        &self,
        shipment: &Shipment,
        request: &CreateShipmentRequest,
    ) -> Option<String>;
    async fn tracking_events(&self, tracking_number: &str) -> Vec<CarrierEvent>;
}
