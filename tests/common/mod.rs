use async_trait::async_trait;
use chrono::{DateTime, Utc};
use envios::domain::ports::{CarrierClient, TrackingEventStore};
use envios::domain::quote::{Address, CreateShipmentRequest, Quote, QuoteRequest};
use envios::domain::shipment::Shipment;
use envios::domain::tracking::{CarrierEvent, TrackingEvent};
use envios::error::{Result, ShippingError};
use envios::infrastructure::in_memory::InMemoryTrackingEventStore;
use rust_decimal_macros::dec;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

pub fn address(province: &str) -> Address {
    Address {
        street: "Av. Colón".to_string(),
        street_number: "1234".to_string(),
        apartment: None,
        city: "Córdoba".to_string(),
        province: province.to_string(),
        postal_code: "5000".to_string(),
        additional_info: None,
    }
}

pub fn create_request(order_code: &str) -> CreateShipmentRequest {
    CreateShipmentRequest {
        order_code: order_code.to_string(),
        shipping_address: address("Córdoba"),
        recipient_name: "Juan Pérez".to_string(),
        recipient_email: "juan@example.com".to_string(),
        recipient_phone: Some("+54 351 555 0000".to_string()),
        service_type: "STANDARD".to_string(),
        declared_value: Some(dec!(15000)),
        weight_kg: dec!(2.0),
    }
}

pub fn carrier_event(event_date: DateTime<Utc>, status: &str) -> CarrierEvent {
    CarrierEvent {
        event_date,
        status: status.to_string(),
        description: Some(format!("evento {status}")),
        location: Some("Centro de Distribución Córdoba".to_string()),
        carrier_event_id: None,
    }
}

/// Carrier stand-in with a scripted, swappable event list. Order creation
/// always succeeds with sequential tracking numbers, so reconciliation tests
/// control exactly which events arrive and when.
pub struct ScriptedCarrier {
    events: Mutex<Vec<CarrierEvent>>,
    counter: AtomicU32,
}

impl ScriptedCarrier {
    pub fn new(events: Vec<CarrierEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            counter: AtomicU32::new(0),
        }
    }

    pub fn set_events(&self, events: Vec<CarrierEvent>) {
        *self.events.lock().unwrap() = events;
    }
}

#[async_trait]
impl CarrierClient for ScriptedCarrier {
    async fn authenticate(&self) -> Result<String> {
        Ok("scripted-token".to_string())
    }

    async fn quotes(&self, _request: &QuoteRequest) -> Vec<Quote> {
        vec![Quote {
            carrier: "ANDREANI".to_string(),
            service_type: "STANDARD".to_string(),
            service_name: "Andreani Standard".to_string(),
            price: dec!(1500),
            estimated_days: 3,
            description: "Envío estándar a domicilio".to_string(),
        }]
    }

    async fn create_order(
        &self,
        _shipment: &Shipment,
        _request: &CreateShipmentRequest,
    ) -> Option<String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Some(format!("AND{n:010}"))
    }

    async fn tracking_events(&self, _tracking_number: &str) -> Vec<CarrierEvent> {
        self.events.lock().unwrap().clone()
    }
}

/// Event store that fails for one designated shipment, to exercise the
/// updater's skip-and-continue behavior.
pub struct FailingEventStore {
    inner: InMemoryTrackingEventStore,
    poisoned: Mutex<Option<Uuid>>,
}

impl FailingEventStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryTrackingEventStore::new(),
            poisoned: Mutex::new(None),
        }
    }

    pub fn poison(&self, shipment_id: Uuid) {
        *self.poisoned.lock().unwrap() = Some(shipment_id);
    }

    fn is_poisoned(&self, shipment_id: Uuid) -> bool {
        *self.poisoned.lock().unwrap() == Some(shipment_id)
    }
}

#[async_trait]
impl TrackingEventStore for FailingEventStore {
    async fn append(&self, event: TrackingEvent) -> Result<()> {
        if self.is_poisoned(event.shipment_id) {
            return Err(ShippingError::Store("induced event-store failure".to_string()));
        }
        self.inner.append(event).await
    }

    async fn for_shipment(&self, shipment_id: Uuid) -> Result<Vec<TrackingEvent>> {
        if self.is_poisoned(shipment_id) {
            return Err(ShippingError::Store("induced event-store failure".to_string()));
        }
        self.inner.for_shipment(shipment_id).await
    }
}
