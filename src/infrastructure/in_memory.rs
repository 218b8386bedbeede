use crate::domain::ports::{ShipmentStore, TrackingEventStore};
use crate::domain::shipment::{Shipment, ShipmentStatus};
use crate::domain::tracking::TrackingEvent;
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory shipment store.
///
/// Uses `Arc<RwLock<..>>` to allow shared concurrent access. The primary map
/// is keyed by id; order code and tracking number are maintained as unique
/// secondary indexes.
#[derive(Default, Clone)]
pub struct InMemoryShipmentStore {
    inner: Arc<RwLock<ShipmentTable>>,
}

#[derive(Default)]
struct ShipmentTable {
    by_id: HashMap<Uuid, Shipment>,
    order_index: HashMap<String, Uuid>,
    tracking_index: HashMap<String, Uuid>,
}

impl InMemoryShipmentStore {
    /// Creates a new, empty in-memory shipment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShipmentStore for InMemoryShipmentStore {
    async fn save(&self, shipment: Shipment) -> Result<()> {
        let mut table = self.inner.write().await;

        if let Some(existing) = table.order_index.get(&shipment.order_code)
            && *existing != shipment.id
        {
            return Err(ShippingError::Store(format!(
                "order code {} already belongs to another shipment",
                shipment.order_code
            )));
        }
        if let Some(tracking) = &shipment.tracking_number
            && let Some(existing) = table.tracking_index.get(tracking)
            && *existing != shipment.id
        {
            return Err(ShippingError::Store(format!(
                "tracking number {tracking} already belongs to another shipment"
            )));
        }

        table.order_index.insert(shipment.order_code.clone(), shipment.id);
        if let Some(tracking) = &shipment.tracking_number {
            table.tracking_index.insert(tracking.clone(), shipment.id);
        }
        table.by_id.insert(shipment.id, shipment);
        Ok(())
    }

    async fn by_order_code(&self, order_code: &str) -> Result<Option<Shipment>> {
        let table = self.inner.read().await;
        Ok(table
            .order_index
            .get(order_code)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn by_tracking_number(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        let table = self.inner.read().await;
        Ok(table
            .tracking_index
            .get(tracking_number)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn by_status(&self, statuses: &[ShipmentStatus]) -> Result<Vec<Shipment>> {
        let table = self.inner.read().await;
        let mut shipments: Vec<Shipment> = table
            .by_id
            .values()
            .filter(|shipment| statuses.contains(&shipment.status))
            .cloned()
            .collect();
        shipments.sort_by_key(|shipment| shipment.created_at);
        Ok(shipments)
    }

    async fn by_recipient_email(&self, email: &str) -> Result<Vec<Shipment>> {
        let table = self.inner.read().await;
        let mut shipments: Vec<Shipment> = table
            .by_id
            .values()
            .filter(|shipment| shipment.recipient.email == email)
            .cloned()
            .collect();
        shipments.sort_by_key(|shipment| shipment.created_at);
        Ok(shipments)
    }
}

/// A thread-safe in-memory tracking-event store, one event list per shipment.
#[derive(Default, Clone)]
pub struct InMemoryTrackingEventStore {
    events: Arc<RwLock<HashMap<Uuid, Vec<TrackingEvent>>>>,
}

impl InMemoryTrackingEventStore {
    /// Creates a new, empty in-memory tracking-event store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackingEventStore for InMemoryTrackingEventStore {
    async fn append(&self, event: TrackingEvent) -> Result<()> {
        let mut events = self.events.write().await;
        events.entry(event.shipment_id).or_default().push(event);
        Ok(())
    }

    async fn for_shipment(&self, shipment_id: Uuid) -> Result<Vec<TrackingEvent>> {
        let events = self.events.read().await;
        let mut list = events.get(&shipment_id).cloned().unwrap_or_default();
        list.sort_by(|a, b| b.event_date.cmp(&a.event_date));
        Ok(list)
    }
}
