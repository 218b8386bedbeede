use crate::domain::ports::CarrierClient;
use crate::domain::quote::{CreateShipmentRequest, Quote, QuoteRequest};
use crate::domain::shipment::{CARRIER_NAME, Shipment};
use crate::domain::tracking::CarrierEvent;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;
use tracing::{info, warn};

const DEFAULT_FAILURE_RATE: f64 = 0.05;
const DEFAULT_DELIVERY_RATE: f64 = 0.30;

/// Stand-in carrier for environments without real Andreani credentials.
///
/// Pricing, delivery-day adjustments, and the synthetic event sequence mirror
/// the real carrier's shapes; order creation fails randomly at a configurable
/// rate and the final "delivered" event appears with a configurable
/// probability so downstream reconciliation gets exercised.
pub struct MockCarrier {
    rng: Mutex<StdRng>,
    failure_rate: f64,
    delivery_rate: f64,
}

impl Default for MockCarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCarrier {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
            failure_rate: DEFAULT_FAILURE_RATE,
            delivery_rate: DEFAULT_DELIVERY_RATE,
        }
    }

    /// Overrides the random rates. `0.0`/`1.0` make the mock deterministic.
    pub fn with_rates(failure_rate: f64, delivery_rate: f64) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
            failure_rate,
            delivery_rate,
        }
    }

    /// Fully deterministic variant for tests.
    pub fn seeded(seed: u64, failure_rate: f64, delivery_rate: f64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            failure_rate,
            delivery_rate,
        }
    }
}

#[async_trait]
impl CarrierClient for MockCarrier {
    async fn authenticate(&self) -> Result<String> {
        Ok(format!("mock-token-{}", Utc::now().timestamp_millis()))
    }

    async fn quotes(&self, request: &QuoteRequest) -> Vec<Quote> {
        let destination = &request.destination_address;
        info!(
            city = %destination.city,
            postal_code = %destination.postal_code,
            "mock carrier: generating quotes"
        );

        let province = destination.province.as_str();
        vec![
            tier(request, province, "STANDARD", "Andreani Standard", dec!(1.0), 3,
                "Envío estándar a domicilio"),
            tier(request, province, "EXPRESS", "Andreani Express", dec!(1.5), 1,
                "Envío express 24/48hs"),
            tier(request, province, "SUCURSAL", "Andreani Sucursal", dec!(0.8), 2,
                "Retiro en sucursal Andreani"),
        ]
    }

    async fn create_order(
        &self,
        _shipment: &Shipment,
        request: &CreateShipmentRequest,
    ) -> Option<String> {
        info!(order_code = %request.order_code, "mock carrier: creating order");

        let mut rng = self.rng.lock().await;
        if rng.random_bool(self.failure_rate) {
            warn!(order_code = %request.order_code, "mock carrier: simulated order failure");
            return None;
        }

        let tracking_number = format!("AND{:010}", rng.random_range(0..1_000_000_000u32));
        info!(%tracking_number, "mock carrier: order created");
        Some(tracking_number)
    }

    async fn tracking_events(&self, tracking_number: &str) -> Vec<CarrierEvent> {
        info!(%tracking_number, "mock carrier: fetching tracking events");

        let now = Utc::now();
        let mut events = vec![
            mock_event(now - Duration::days(2), "CREADO",
                "Orden creada en el sistema", "Centro de Distribución Córdoba"),
            mock_event(now - Duration::days(1), "RETIRADO",
                "Paquete retirado del origen", "Centro de Distribución Córdoba"),
            mock_event(now - Duration::hours(12), "EN_TRANSITO",
                "En tránsito hacia destino", "Centro de Distribución Buenos Aires"),
            mock_event(now - Duration::hours(2), "SALIDA_REPARTO",
                "Salió para entrega", "Base de Reparto Zona Norte"),
        ];

        let delivered = self.rng.lock().await.random_bool(self.delivery_rate);
        if delivered {
            events.push(mock_event(now - Duration::minutes(30), "ENTREGADO",
                "Paquete entregado al destinatario", "Domicilio del destinatario"));
        }

        events
    }
}

fn tier(
    request: &QuoteRequest,
    province: &str,
    service_type: &str,
    service_name: &str,
    multiplier: Decimal,
    base_days: u32,
    description: &str,
) -> Quote {
    Quote {
        carrier: CARRIER_NAME.to_string(),
        service_type: service_type.to_string(),
        service_name: service_name.to_string(),
        price: mock_price(request.weight_kg, province, multiplier),
        estimated_days: mock_days(province, base_days),
        description: description.to_string(),
    }
}

/// Base price per kg times a province surcharge and the tier multiplier,
/// rounded up to the next whole peso.
fn mock_price(weight_kg: Decimal, province: &str, multiplier: Decimal) -> Decimal {
    (weight_kg * Decimal::from(800) * province_factor(province) * multiplier).ceil()
}

fn province_factor(province: &str) -> Decimal {
    match province.to_lowercase().as_str() {
        "córdoba" | "cordoba" => dec!(1.0),
        "buenos aires" | "caba" => dec!(1.2),
        "santa fe" | "mendoza" => dec!(1.3),
        _ => dec!(1.5),
    }
}

fn mock_days(province: &str, base_days: u32) -> u32 {
    match province {
        "Córdoba" | "Buenos Aires" => base_days,
        "CABA" | "Santa Fe" => base_days + 1,
        _ => base_days + 2,
    }
}

fn mock_event(
    event_date: chrono::DateTime<Utc>,
    status: &str,
    description: &str,
    location: &str,
) -> CarrierEvent {
    CarrierEvent {
        event_date,
        status: status.to_string(),
        description: Some(description.to_string()),
        location: Some(location.to_string()),
        carrier_event_id: None,
    }
}
