use crate::domain::ports::{ShipmentStore, TrackingEventStore};
use crate::domain::shipment::{Shipment, ShipmentStatus};
use crate::domain::tracking::TrackingEvent;
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family for shipment records, keyed by id.
pub const CF_SHIPMENTS: &str = "shipments";
/// Column Family mapping order code → shipment id.
pub const CF_ORDER_INDEX: &str = "order_index";
/// Column Family mapping tracking number → shipment id.
pub const CF_TRACKING_INDEX: &str = "tracking_index";
/// Column Family for per-shipment tracking event lists.
pub const CF_EVENTS: &str = "tracking_events";

/// A persistent store implementation using RocksDB.
///
/// Handles storage for both `Shipment` and `TrackingEvent` records using
/// separate Column Families; order code and tracking number live in their own
/// index families so lookups stay point reads.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_SHIPMENTS, CF_ORDER_INDEX, CF_TRACKING_INDEX, CF_EVENTS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, families)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| ShippingError::Store(format!("column family {name} not found")))
    }
}

#[async_trait]
impl ShipmentStore for RocksDBStore {
    async fn save(&self, shipment: Shipment) -> Result<()> {
        let shipments = self.cf(CF_SHIPMENTS)?;
        let order_index = self.cf(CF_ORDER_INDEX)?;
        let tracking_index = self.cf(CF_TRACKING_INDEX)?;

        let id_bytes = shipment.id.as_bytes().to_vec();

        if let Some(existing) = self.db.get_cf(&order_index, shipment.order_code.as_bytes())?
            && existing != id_bytes
        {
            return Err(ShippingError::Store(format!(
                "order code {} already belongs to another shipment",
                shipment.order_code
            )));
        }
        if let Some(tracking) = &shipment.tracking_number
            && let Some(existing) = self.db.get_cf(&tracking_index, tracking.as_bytes())?
            && existing != id_bytes
        {
            return Err(ShippingError::Store(format!(
                "tracking number {tracking} already belongs to another shipment"
            )));
        }

        let value = serde_json::to_vec(&shipment)?;
        self.db.put_cf(&shipments, &id_bytes, value)?;
        self.db
            .put_cf(&order_index, shipment.order_code.as_bytes(), &id_bytes)?;
        if let Some(tracking) = &shipment.tracking_number {
            self.db.put_cf(&tracking_index, tracking.as_bytes(), &id_bytes)?;
        }
        Ok(())
    }

    async fn by_order_code(&self, order_code: &str) -> Result<Option<Shipment>> {
        let order_index = self.cf(CF_ORDER_INDEX)?;
        let shipments = self.cf(CF_SHIPMENTS)?;

        let Some(id_bytes) = self.db.get_cf(&order_index, order_code.as_bytes())? else {
            return Ok(None);
        };
        match self.db.get_cf(&shipments, id_bytes)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn by_tracking_number(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        let tracking_index = self.cf(CF_TRACKING_INDEX)?;
        let shipments = self.cf(CF_SHIPMENTS)?;

        let Some(id_bytes) = self.db.get_cf(&tracking_index, tracking_number.as_bytes())? else {
            return Ok(None);
        };
        match self.db.get_cf(&shipments, id_bytes)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn by_status(&self, statuses: &[ShipmentStatus]) -> Result<Vec<Shipment>> {
        let shipments = self.cf(CF_SHIPMENTS)?;

        let mut matches = Vec::new();
        for item in self.db.iterator_cf(&shipments, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let shipment: Shipment = serde_json::from_slice(&value)?;
            if statuses.contains(&shipment.status) {
                matches.push(shipment);
            }
        }
        matches.sort_by_key(|shipment| shipment.created_at);
        Ok(matches)
    }

    async fn by_recipient_email(&self, email: &str) -> Result<Vec<Shipment>> {
        let shipments = self.cf(CF_SHIPMENTS)?;

        let mut matches = Vec::new();
        for item in self.db.iterator_cf(&shipments, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let shipment: Shipment = serde_json::from_slice(&value)?;
            if shipment.recipient.email == email {
                matches.push(shipment);
            }
        }
        matches.sort_by_key(|shipment| shipment.created_at);
        Ok(matches)
    }
}

#[async_trait]
impl TrackingEventStore for RocksDBStore {
    async fn append(&self, event: TrackingEvent) -> Result<()> {
        let events = self.cf(CF_EVENTS)?;
        let key = event.shipment_id.as_bytes().to_vec();

        let mut list: Vec<TrackingEvent> = match self.db.get_cf(&events, &key)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Vec::new(),
        };
        list.push(event);

        self.db.put_cf(&events, key, serde_json::to_vec(&list)?)?;
        Ok(())
    }

    async fn for_shipment(&self, shipment_id: Uuid) -> Result<Vec<TrackingEvent>> {
        let events = self.cf(CF_EVENTS)?;

        let mut list: Vec<TrackingEvent> = match self.db.get_cf(&events, shipment_id.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Vec::new(),
        };
        list.sort_by(|a, b| b.event_date.cmp(&a.event_date));
        Ok(list)
    }
}
