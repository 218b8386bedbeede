use crate::domain::ports::{CarrierRef, ShipmentStoreRef, TrackingEventStoreRef};
use crate::domain::quote::{Address, CreateShipmentRequest, Quote, QuoteRequest};
use crate::domain::shipment::{Shipment, ShipmentStatus, ShipmentView};
use crate::domain::tracking::TrackingEvent;
use crate::error::{Result, ShippingError};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{error, info, warn};

/// The main entry point for the shipping application.
///
/// `ShippingService` drives shipments through their lifecycle: quoting,
/// creation with the carrier, lookups, cancellation, and tracking
/// reconciliation. It owns shared handles to the stores and the carrier
/// client; the periodic updater calls back into it for each batch item.
pub struct ShippingService {
    shipments: ShipmentStoreRef,
    events: TrackingEventStoreRef,
    carrier: CarrierRef,
    /// Shop origin used when the service builds quote requests itself.
    origin: Address,
}

impl ShippingService {
    pub fn new(
        shipments: ShipmentStoreRef,
        events: TrackingEventStoreRef,
        carrier: CarrierRef,
        origin: Address,
    ) -> Self {
        Self {
            shipments,
            events,
            carrier,
            origin,
        }
    }

    /// Returns carrier tariff options for a prospective shipment.
    ///
    /// A display-layer concern: this never fails, since the carrier client
    /// degrades to a default tariff on its own errors.
    pub async fn get_quotes(&self, request: &QuoteRequest) -> Vec<Quote> {
        self.carrier.quotes(request).await
    }

    /// Creates a shipment order, idempotent by order code.
    ///
    /// The PENDING record is persisted before the carrier is called, so a
    /// crash mid-flow always leaves a recoverable row keyed by order code.
    /// Carrier acceptance moves the shipment to CREATED and backfills cost
    /// and delivery estimate from a fresh quote; carrier refusal marks it
    /// ERROR without a tracking number.
    pub async fn create_shipment(&self, request: CreateShipmentRequest) -> Result<ShipmentView> {
        if let Some(existing) = self.shipments.by_order_code(&request.order_code).await? {
            warn!(order_code = %request.order_code, "shipment already exists, returning it");
            return self.view_of(existing).await;
        }

        info!(order_code = %request.order_code, "creating shipment");
        let mut shipment = Shipment::new(&request, Utc::now());
        self.shipments.save(shipment.clone()).await?;

        match self.carrier.create_order(&shipment, &request).await {
            Some(tracking_number) => {
                shipment.mark_created(tracking_number, Utc::now());

                let quotes = self.get_quotes(&self.quote_request_for(&request)).await;
                if let Some(quote) = quotes.first() {
                    shipment.apply_quote(quote, Utc::now());
                }

                self.shipments.save(shipment.clone()).await?;
                info!(
                    order_code = %shipment.order_code,
                    tracking_number = %shipment.tracking_number.as_deref().unwrap_or(""),
                    "shipment created with carrier"
                );
            }
            None => {
                shipment.mark_error(Utc::now());
                self.shipments.save(shipment.clone()).await?;
                error!(order_code = %shipment.order_code, "carrier rejected shipment creation");
            }
        }

        Ok(ShipmentView {
            shipment,
            tracking_events: Vec::new(),
        })
    }

    pub async fn get_by_order_code(&self, order_code: &str) -> Result<ShipmentView> {
        match self.shipments.by_order_code(order_code).await? {
            Some(shipment) => self.view_of(shipment).await,
            None => Err(ShippingError::NotFound(format!("order {order_code}"))),
        }
    }

    /// Looks a shipment up by tracking number, refreshing its tracking state
    /// first so the returned view is current. Refresh trouble is logged, not
    /// surfaced, and the lookup itself still answers.
    pub async fn get_by_tracking_number(&self, tracking_number: &str) -> Result<ShipmentView> {
        let Some(shipment) = self.shipments.by_tracking_number(tracking_number).await? else {
            return Err(ShippingError::NotFound(format!("tracking {tracking_number}")));
        };

        if let Err(error) = self.refresh_tracking(&shipment).await {
            warn!(%error, %tracking_number, "tracking refresh failed before lookup");
        }

        let order_code = shipment.order_code.clone();
        self.get_by_order_code(&order_code).await
    }

    /// Cancels a shipment still in a cancellable status.
    ///
    /// Returns false (never an error) when the shipment does not exist, is
    /// past cancellation, or the store misbehaves.
    pub async fn cancel_shipment(&self, order_code: &str) -> bool {
        let shipment = match self.shipments.by_order_code(order_code).await {
            Ok(Some(shipment)) => shipment,
            Ok(None) => return false,
            Err(error) => {
                error!(%error, order_code, "cancel lookup failed");
                return false;
            }
        };

        let mut shipment = shipment;
        if !shipment.cancel(Utc::now()) {
            return false;
        }

        match self.shipments.save(shipment).await {
            Ok(()) => {
                info!(order_code, "shipment cancelled");
                true
            }
            Err(error) => {
                error!(%error, order_code, "cancel persist failed");
                false
            }
        }
    }

    /// Shipments the periodic updater should poll the carrier for.
    pub async fn active_shipments(&self) -> Result<Vec<Shipment>> {
        self.shipments.by_status(&ShipmentStatus::ACTIVE).await
    }

    /// Reconciles a shipment's tracking state against the carrier.
    ///
    /// Fetched events already stored under the same (event date, status) pair
    /// are skipped; the rest are appended and the shipment status re-evaluated
    /// per event. The natural-key check is the only safeguard against double
    /// inserts under concurrent refreshes, so a duplicate is a no-op outcome,
    /// not a conflict. Shipments without a tracking number are skipped.
    ///
    /// Returns the number of newly recorded events.
    pub async fn refresh_tracking(&self, shipment: &Shipment) -> Result<usize> {
        let Some(tracking_number) = shipment.tracking_number.as_deref() else {
            return Ok(0);
        };

        let fetched = self.carrier.tracking_events(tracking_number).await;
        if fetched.is_empty() {
            return Ok(0);
        }

        let existing = self.events.for_shipment(shipment.id).await?;
        let mut seen: HashSet<(DateTime<Utc>, String)> = existing
            .iter()
            .map(|event| (event.event_date, event.status.clone()))
            .collect();

        let mut shipment = shipment.clone();
        let mut appended = 0;
        for event in fetched {
            if !seen.insert((event.event_date, event.status.clone())) {
                continue;
            }

            self.events
                .append(TrackingEvent::from_carrier(shipment.id, &event, Utc::now()))
                .await?;
            appended += 1;

            if shipment.apply_carrier_status(&event.status, Utc::now()) {
                self.shipments.save(shipment.clone()).await?;
                info!(
                    %tracking_number,
                    status = ?shipment.status,
                    carrier_status = %event.status,
                    "shipment status updated"
                );
            }
        }

        Ok(appended)
    }

    async fn view_of(&self, shipment: Shipment) -> Result<ShipmentView> {
        let tracking_events = self.events.for_shipment(shipment.id).await?;
        Ok(ShipmentView {
            shipment,
            tracking_events,
        })
    }

    fn quote_request_for(&self, request: &CreateShipmentRequest) -> QuoteRequest {
        QuoteRequest {
            origin_address: self.origin.clone(),
            destination_address: request.shipping_address.clone(),
            weight_kg: request.weight_kg,
            declared_value: request.declared_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::{InMemoryShipmentStore, InMemoryTrackingEventStore};
    use crate::infrastructure::mock::MockCarrier;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn shop_origin() -> Address {
        Address {
            street: "Tu Calle".to_string(),
            street_number: "123".to_string(),
            apartment: None,
            city: "Córdoba".to_string(),
            province: "Córdoba".to_string(),
            postal_code: "5000".to_string(),
            additional_info: None,
        }
    }

    fn service_with(carrier: MockCarrier) -> ShippingService {
        ShippingService::new(
            Arc::new(InMemoryShipmentStore::new()),
            Arc::new(InMemoryTrackingEventStore::new()),
            Arc::new(carrier),
            shop_origin(),
        )
    }

    fn sample_request(order_code: &str) -> CreateShipmentRequest {
        CreateShipmentRequest {
            order_code: order_code.to_string(),
            shipping_address: Address {
                street: "Av. Colón".to_string(),
                street_number: "1234".to_string(),
                apartment: None,
                city: "Córdoba".to_string(),
                province: "Córdoba".to_string(),
                postal_code: "5000".to_string(),
                additional_info: None,
            },
            recipient_name: "Juan Pérez".to_string(),
            recipient_email: "juan@example.com".to_string(),
            recipient_phone: None,
            service_type: "STANDARD".to_string(),
            declared_value: None,
            weight_kg: dec!(2.0),
        }
    }

    #[tokio::test]
    async fn test_create_then_lookup_by_order_code() {
        let service = service_with(MockCarrier::seeded(7, 0.0, 0.0));

        let created = service.create_shipment(sample_request("ORD-1001")).await.unwrap();
        assert_eq!(created.shipment.status, ShipmentStatus::Created);
        assert!(created.shipment.tracking_number.is_some());
        // Cost backfilled from the first (standard) mock tier: 2.0 × 800 × 1.0
        assert_eq!(created.shipment.shipping_cost, Some(dec!(1600)));
        assert!(created.shipment.estimated_delivery_date.is_some());

        let found = service.get_by_order_code("ORD-1001").await.unwrap();
        assert_eq!(found.shipment.id, created.shipment.id);
        assert_eq!(found.shipment.order_code, "ORD-1001");
    }

    #[tokio::test]
    async fn test_create_is_idempotent_by_order_code() {
        let service = service_with(MockCarrier::seeded(7, 0.0, 0.0));

        let first = service.create_shipment(sample_request("ORD-1001")).await.unwrap();
        let second = service.create_shipment(sample_request("ORD-1001")).await.unwrap();

        assert_eq!(first.shipment.id, second.shipment.id);
        assert_eq!(first.shipment.tracking_number, second.shipment.tracking_number);
    }

    #[tokio::test]
    async fn test_carrier_refusal_marks_error() {
        let service = service_with(MockCarrier::seeded(7, 1.0, 0.0));

        let created = service.create_shipment(sample_request("ORD-1001")).await.unwrap();
        assert_eq!(created.shipment.status, ShipmentStatus::Error);
        assert!(created.shipment.tracking_number.is_none());
        assert!(created.shipment.shipping_cost.is_none());

        // The ERROR row is still recoverable by order code
        let found = service.get_by_order_code("ORD-1001").await.unwrap();
        assert_eq!(found.shipment.status, ShipmentStatus::Error);
    }

    #[tokio::test]
    async fn test_lookup_missing_order_is_not_found() {
        let service = service_with(MockCarrier::seeded(7, 0.0, 0.0));
        let result = service.get_by_order_code("ORD-404").await;
        assert!(matches!(result, Err(ShippingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancel_only_in_cancellable_statuses() {
        let service = service_with(MockCarrier::seeded(7, 0.0, 0.0));
        service.create_shipment(sample_request("ORD-1001")).await.unwrap();

        // CREATED cancels fine
        assert!(service.cancel_shipment("ORD-1001").await);
        let view = service.get_by_order_code("ORD-1001").await.unwrap();
        assert_eq!(view.shipment.status, ShipmentStatus::Cancelled);

        // A second cancel is refused, as is one for a missing order
        assert!(!service.cancel_shipment("ORD-1001").await);
        assert!(!service.cancel_shipment("ORD-404").await);
    }

    #[tokio::test]
    async fn test_get_quotes_returns_three_mock_tiers() {
        let service = service_with(MockCarrier::seeded(7, 0.0, 0.0));
        let request = sample_request("ORD-1001");

        let quotes = service
            .get_quotes(&QuoteRequest {
                origin_address: shop_origin(),
                destination_address: request.shipping_address.clone(),
                weight_kg: request.weight_kg,
                declared_value: None,
            })
            .await;

        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[0].price, dec!(1600));
    }

    #[tokio::test]
    async fn test_refresh_tracking_skips_without_tracking_number() {
        let service = service_with(MockCarrier::seeded(7, 1.0, 0.0));
        let created = service.create_shipment(sample_request("ORD-1001")).await.unwrap();

        // ERROR shipment has no tracking number, so refresh is a no-op
        let appended = service.refresh_tracking(&created.shipment).await.unwrap();
        assert_eq!(appended, 0);
    }

    #[tokio::test]
    async fn test_refresh_tracking_deduplicates_events() {
        let service = service_with(MockCarrier::seeded(7, 0.0, 0.0));
        let created = service.create_shipment(sample_request("ORD-1001")).await.unwrap();

        let first = service.refresh_tracking(&created.shipment).await.unwrap();
        assert_eq!(first, 4);

        // The mock anchors events to "now", so a second fetch yields fresh
        // timestamps; dedup is exercised end-to-end in the integration tests
        // with a scripted carrier. Here: same pass re-run keeps the view sane.
        let view = service.get_by_order_code("ORD-1001").await.unwrap();
        assert!(view.tracking_events.len() >= 4);
        // Newest first
        assert!(
            view.tracking_events
                .windows(2)
                .all(|w| w[0].event_date >= w[1].event_date)
        );
    }

    #[tokio::test]
    async fn test_get_by_tracking_number_refreshes_first() {
        let service = service_with(MockCarrier::seeded(7, 0.0, 1.0));
        let created = service.create_shipment(sample_request("ORD-1001")).await.unwrap();
        let tracking = created.shipment.tracking_number.clone().unwrap();

        let view = service.get_by_tracking_number(&tracking).await.unwrap();
        // Delivery rate 1.0: the refresh recorded the ENTREGADO event and the
        // status followed it
        assert_eq!(view.shipment.status, ShipmentStatus::Delivered);
        assert!(view.shipment.actual_delivery_date.is_some());
        assert_eq!(view.tracking_events.len(), 5);
        assert_eq!(view.tracking_events[0].status, "ENTREGADO");
    }

    #[tokio::test]
    async fn test_get_by_tracking_number_missing_is_not_found() {
        let service = service_with(MockCarrier::seeded(7, 0.0, 0.0));
        let result = service.get_by_tracking_number("AND0000000000").await;
        assert!(matches!(result, Err(ShippingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_active_shipments_excludes_terminal_rows() {
        let service = service_with(MockCarrier::seeded(7, 0.0, 0.0));
        service.create_shipment(sample_request("ORD-1")).await.unwrap();
        service.create_shipment(sample_request("ORD-2")).await.unwrap();
        service.cancel_shipment("ORD-2").await;

        let active = service.active_shipments().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].order_code, "ORD-1");
    }
}
