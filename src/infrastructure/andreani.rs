use crate::config::CarrierConfig;
use crate::domain::ports::CarrierClient;
use crate::domain::quote::{Address, CreateShipmentRequest, Quote, QuoteRequest};
use crate::domain::shipment::{CARRIER_NAME, Shipment};
use crate::domain::tracking::CarrierEvent;
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Tokens live ~60 minutes on the carrier side; renew with a safety margin.
const TOKEN_TTL_MINUTES: i64 = 50;
/// Packaging heuristic: 1 kg ≈ 2000 cm³.
const VOLUME_CM3_PER_KG: f64 = 2000.0;

/// HTTP client for the Andreani carrier API.
///
/// Each operation degrades on its own terms rather than propagating carrier
/// trouble: quoting falls back to one conservative default tariff, order
/// creation reports `None`, and tracking reads come back empty. Only
/// authentication surfaces an error.
pub struct AndreaniClient {
    http: reqwest::Client,
    config: CarrierConfig,
    /// Shop origin address used for order payloads.
    origin: Address,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AndreaniClient {
    pub fn new(config: CarrierConfig, origin: Address) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            origin,
            token: Mutex::new(None),
        }
    }

    async fn fetch_quotes(&self, request: &QuoteRequest) -> Result<Vec<Quote>> {
        let token = self.authenticate().await?;
        let payload = self.quote_payload(request);

        info!(city = %request.destination_address.city, "requesting carrier quotes");
        let response = self
            .http
            .post(format!("{}/cotizaciones", self.config.base_url))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ShippingError::Carrier(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ShippingError::Carrier(format!(
                "quote endpoint returned {}",
                response.status()
            )));
        }

        let tariffs: Vec<WireQuote> = response
            .json()
            .await
            .map_err(|e| ShippingError::Carrier(e.to_string()))?;

        Ok(tariffs.into_iter().map(Quote::from).collect())
    }

    async fn submit_order(
        &self,
        request: &CreateShipmentRequest,
    ) -> Result<String> {
        let token = self.authenticate().await?;
        let payload = self.order_payload(request);

        info!(order_code = %request.order_code, "creating carrier order");
        let response = self
            .http
            .post(format!("{}/ordenes", self.config.base_url))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ShippingError::Carrier(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ShippingError::Carrier(format!(
                "order endpoint returned {}",
                response.status()
            )));
        }

        let body: OrderResponse = response
            .json()
            .await
            .map_err(|e| ShippingError::Carrier(e.to_string()))?;

        body.bultos
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|package| package.numero_de_envio)
            .ok_or_else(|| {
                ShippingError::Carrier("order response carried no tracking number".to_string())
            })
    }

    async fn fetch_events(&self, tracking_number: &str) -> Result<Vec<CarrierEvent>> {
        let token = self.authenticate().await?;

        let response = self
            .http
            .get(format!("{}/trazabilidad/{tracking_number}", self.config.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ShippingError::Carrier(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ShippingError::Carrier(format!(
                "tracking endpoint returned {}",
                response.status()
            )));
        }

        let body: TrackingResponse = response
            .json()
            .await
            .map_err(|e| ShippingError::Carrier(e.to_string()))?;

        Ok(body
            .eventos
            .unwrap_or_default()
            .into_iter()
            .map(CarrierEvent::from)
            .collect())
    }

    fn quote_payload(&self, request: &QuoteRequest) -> QuotePayload {
        QuotePayload {
            contrato: self.config.contract.clone(),
            origen: postal_block(&request.origin_address),
            destino: postal_block(&request.destination_address),
            paquetes: vec![package_block(request.weight_kg, request.declared_value)],
        }
    }

    /// Order payloads reuse the quote structures; the origin is always the
    /// configured shop address.
    fn order_payload(&self, request: &CreateShipmentRequest) -> OrderPayload {
        OrderPayload {
            contrato: self.config.contract.clone(),
            origen: postal_block(&self.origin),
            destino: postal_block(&request.shipping_address),
            paquetes: vec![package_block(request.weight_kg, request.declared_value)],
            remitente: "Tu Tienda Online".to_string(),
            destinatario: request.recipient_name.clone(),
            telefono: request.recipient_phone.clone(),
            email: Some(request.recipient_email.clone()),
        }
    }
}

#[async_trait]
impl CarrierClient for AndreaniClient {
    /// Obtains a bearer token, reusing the cached one while it is fresh.
    ///
    /// The lock is held across the refresh so concurrent callers coalesce on
    /// a single token request; overwriting with a newer token is harmless.
    async fn authenticate(&self) -> Result<String> {
        let mut cache = self.token.lock().await;
        if let Some(cached) = cache.as_ref()
            && Utc::now() < cached.expires_at
        {
            return Ok(cached.value.clone());
        }

        info!("requesting carrier auth token");
        let response = self
            .http
            .post(format!("{}/auth", self.config.base_url))
            .json(&AuthRequest {
                usuario: &self.config.user,
                password: &self.config.password,
                cliente: &self.config.client_id,
            })
            .send()
            .await
            .map_err(|e| ShippingError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ShippingError::Auth(format!(
                "auth endpoint returned {}",
                response.status()
            )));
        }

        let body: AuthResponse = response
            .json()
            .await
            .map_err(|e| ShippingError::Auth(e.to_string()))?;
        let token = body
            .token
            .ok_or_else(|| ShippingError::Auth("auth response missing token".to_string()))?;

        *cache = Some(CachedToken {
            value: token.clone(),
            expires_at: Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES),
        });
        Ok(token)
    }

    async fn quotes(&self, request: &QuoteRequest) -> Vec<Quote> {
        match self.fetch_quotes(request).await {
            Ok(quotes) => quotes,
            Err(error) => {
                warn!(%error, "quote request failed, falling back to default tariff");
                vec![default_quote()]
            }
        }
    }

    async fn create_order(
        &self,
        _shipment: &Shipment,
        request: &CreateShipmentRequest,
    ) -> Option<String> {
        match self.submit_order(request).await {
            Ok(tracking_number) => {
                info!(%tracking_number, "carrier order created");
                Some(tracking_number)
            }
            Err(error) => {
                warn!(%error, order_code = %request.order_code, "carrier order creation failed");
                None
            }
        }
    }

    async fn tracking_events(&self, tracking_number: &str) -> Vec<CarrierEvent> {
        match self.fetch_events(tracking_number).await {
            Ok(events) => events,
            Err(error) => {
                warn!(%error, %tracking_number, "tracking fetch failed");
                Vec::new()
            }
        }
    }
}

// Wire types. The carrier speaks camelCase Spanish.

#[derive(Serialize)]
struct AuthRequest<'a> {
    usuario: &'a str,
    password: &'a str,
    cliente: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: Option<String>,
}

#[derive(Serialize)]
struct QuotePayload {
    contrato: String,
    origen: PostalWrapper,
    destino: PostalWrapper,
    paquetes: Vec<Package>,
}

#[derive(Serialize)]
struct OrderPayload {
    contrato: String,
    origen: PostalWrapper,
    destino: PostalWrapper,
    paquetes: Vec<Package>,
    remitente: String,
    destinatario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

#[derive(Serialize)]
struct PostalWrapper {
    postal: Postal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Postal {
    codigo_postal: String,
    calle: String,
    numero: String,
    localidad: String,
    region: String,
    pais: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Package {
    peso_kilogramos: f64,
    volumen_centimetros_cubicos: f64,
    categoria: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    valor_declarado_con_iva: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuote {
    modalidad: Option<String>,
    tarifa_con_iva: Option<f64>,
    plazo_entrega: Option<String>,
}

#[derive(Deserialize)]
struct OrderResponse {
    bultos: Option<Vec<OrderPackage>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderPackage {
    numero_de_envio: Option<String>,
}

#[derive(Deserialize)]
struct TrackingResponse {
    eventos: Option<Vec<WireEvent>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    fecha: Option<String>,
    estado: Option<String>,
    motivo: Option<String>,
    sucursal: Option<String>,
    id_de_evento: Option<String>,
}

impl From<WireQuote> for Quote {
    fn from(wire: WireQuote) -> Self {
        let modality = wire.modalidad.unwrap_or_else(|| "STANDARD".to_string());
        let plazo = wire.plazo_entrega;
        Quote {
            carrier: CARRIER_NAME.to_string(),
            service_type: modality.clone(),
            service_name: format!("Andreani - {modality}"),
            price: wire
                .tarifa_con_iva
                .and_then(Decimal::from_f64)
                .unwrap_or(Decimal::ZERO),
            estimated_days: parse_delivery_days(plazo.as_deref()),
            description: format!("Envío con Andreani - {}", plazo.as_deref().unwrap_or("-")),
        }
    }
}

impl From<WireEvent> for CarrierEvent {
    fn from(wire: WireEvent) -> Self {
        CarrierEvent {
            event_date: parse_event_date(wire.fecha.as_deref()),
            status: wire.estado.unwrap_or_default(),
            description: wire.motivo,
            location: wire.sucursal,
            carrier_event_id: wire.id_de_evento,
        }
    }
}

fn postal_block(address: &Address) -> PostalWrapper {
    PostalWrapper {
        postal: Postal {
            codigo_postal: address.postal_code.clone(),
            calle: address.street.clone(),
            numero: address.street_number.clone(),
            localidad: address.city.clone(),
            region: province_region(&address.province).to_string(),
            pais: "Argentina".to_string(),
        },
    }
}

fn package_block(weight_kg: Decimal, declared_value: Option<Decimal>) -> Package {
    let weight = weight_kg.to_f64().unwrap_or(0.0);
    Package {
        peso_kilogramos: weight,
        volumen_centimetros_cubicos: weight * VOLUME_CM3_PER_KG,
        categoria: "Productos varios".to_string(),
        valor_declarado_con_iva: declared_value.and_then(|value| value.to_f64()),
    }
}

fn default_quote() -> Quote {
    Quote {
        carrier: CARRIER_NAME.to_string(),
        service_type: "STANDARD".to_string(),
        service_name: "Andreani Standard".to_string(),
        price: dec!(1500),
        estimated_days: 3,
        description: "Envío estándar con Andreani (cotización estimada)".to_string(),
    }
}

/// Argentine province → ISO 3166-2:AR region code.
const PROVINCE_REGIONS: &[(&str, &str)] = &[
    ("Buenos Aires", "AR-B"),
    ("CABA", "AR-C"),
    ("Córdoba", "AR-X"),
    ("Santa Fe", "AR-S"),
    ("Mendoza", "AR-M"),
    ("Tucumán", "AR-T"),
    ("Entre Ríos", "AR-E"),
    ("Salta", "AR-A"),
    ("Misiones", "AR-N"),
    ("Chaco", "AR-H"),
    ("Corrientes", "AR-W"),
    ("Santiago del Estero", "AR-G"),
    ("San Juan", "AR-J"),
    ("Jujuy", "AR-Y"),
    ("Río Negro", "AR-R"),
    ("Formosa", "AR-P"),
    ("Neuquén", "AR-Q"),
    ("Chubut", "AR-U"),
    ("San Luis", "AR-D"),
    ("Catamarca", "AR-K"),
    ("La Rioja", "AR-F"),
    ("La Pampa", "AR-L"),
    ("Santa Cruz", "AR-Z"),
    ("Tierra del Fuego", "AR-V"),
];

fn province_region(province: &str) -> &'static str {
    PROVINCE_REGIONS
        .iter()
        .find(|(name, _)| *name == province)
        .map(|(_, code)| *code)
        .unwrap_or("AR-B")
}

/// Delivery-term text like "24hs" or "3 a 5 días" → days.
fn parse_delivery_days(plazo: Option<&str>) -> u32 {
    let Some(plazo) = plazo else { return 3 };
    let plazo = plazo.to_lowercase();
    if plazo.contains("24") || plazo.contains('1') {
        1
    } else if plazo.contains("48") || plazo.contains('2') {
        2
    } else if plazo.contains('3') {
        3
    } else if plazo.contains('4') {
        4
    } else if plazo.contains('5') {
        5
    } else {
        3
    }
}

/// Carrier dates come as ISO local date-time; unparseable values read as now.
fn parse_event_date(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|value| value.parse::<NaiveDateTime>().ok())
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}
