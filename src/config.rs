use crate::domain::quote::Address;
use crate::error::{Result, ShippingError};
use std::time::Duration;

/// Credentials and endpoint for the Andreani carrier API.
#[derive(Debug, Clone)]
pub struct CarrierConfig {
    pub base_url: String,
    pub user: String,
    pub password: String,
    pub client_id: String,
    pub contract: String,
}

/// Process-wide configuration, loaded once at startup.
///
/// Values come from the environment (a `.env` file is honored when present).
/// The mock carrier is the default; real credentials are only required when
/// `ANDREANI_MOCK_ENABLED=false`.
#[derive(Debug, Clone)]
pub struct Config {
    pub carrier: CarrierConfig,
    pub shop_origin: Address,
    pub mock_enabled: bool,
    pub poll_interval: Duration,
    pub item_pause: Duration,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `ANDREANI_API_URL`, `ANDREANI_API_USER`, `ANDREANI_API_PASSWORD`,
    ///   `ANDREANI_API_CLIENT`, `ANDREANI_API_CONTRACT`
    /// - `SHOP_STREET`, `SHOP_NUMBER`, `SHOP_CITY`, `SHOP_PROVINCE`,
    ///   `SHOP_POSTAL_CODE`
    /// - `ANDREANI_MOCK_ENABLED` (default `true`)
    /// - `TRACKING_POLL_INTERVAL_SECS` (default `300`)
    /// - `TRACKING_ITEM_PAUSE_MS` (default `1000`)
    pub fn from_env() -> Result<Self> {
        let mock_enabled = parse_flag("ANDREANI_MOCK_ENABLED", env_var("ANDREANI_MOCK_ENABLED"))?
            .unwrap_or(true);

        let carrier = CarrierConfig {
            base_url: env_var("ANDREANI_API_URL")
                .unwrap_or_else(|| "https://apis.andreani.com".to_string()),
            user: env_var("ANDREANI_API_USER").unwrap_or_default(),
            password: env_var("ANDREANI_API_PASSWORD").unwrap_or_default(),
            client_id: env_var("ANDREANI_API_CLIENT").unwrap_or_default(),
            contract: env_var("ANDREANI_API_CONTRACT").unwrap_or_default(),
        };

        if !mock_enabled && (carrier.user.is_empty() || carrier.password.is_empty()) {
            return Err(ShippingError::Config(
                "ANDREANI_API_USER and ANDREANI_API_PASSWORD are required when the mock carrier is disabled"
                    .to_string(),
            ));
        }

        let shop_origin = Address {
            street: env_var("SHOP_STREET").unwrap_or_else(|| "Tu Calle".to_string()),
            street_number: env_var("SHOP_NUMBER").unwrap_or_else(|| "123".to_string()),
            apartment: None,
            city: env_var("SHOP_CITY").unwrap_or_else(|| "Córdoba".to_string()),
            province: env_var("SHOP_PROVINCE").unwrap_or_else(|| "Córdoba".to_string()),
            postal_code: env_var("SHOP_POSTAL_CODE").unwrap_or_else(|| "5000".to_string()),
            additional_info: None,
        };

        let poll_secs =
            parse_u64("TRACKING_POLL_INTERVAL_SECS", env_var("TRACKING_POLL_INTERVAL_SECS"))?
                .unwrap_or(300);
        let pause_ms = parse_u64("TRACKING_ITEM_PAUSE_MS", env_var("TRACKING_ITEM_PAUSE_MS"))?
            .unwrap_or(1000);

        Ok(Self {
            carrier,
            shop_origin,
            mock_enabled,
            poll_interval: Duration::from_secs(poll_secs),
            item_pause: Duration::from_millis(pause_ms),
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Parses a boolean flag; parse errors are reported, not swallowed.
fn parse_flag(name: &str, raw: Option<String>) -> Result<Option<bool>> {
    match raw.as_deref() {
        None => Ok(None),
        Some("true") | Some("1") => Ok(Some(true)),
        Some("false") | Some("0") => Ok(Some(false)),
        Some(other) => Err(ShippingError::Config(format!(
            "{name} must be true or false, got {other:?}"
        ))),
    }
}

fn parse_u64(name: &str, raw: Option<String>) -> Result<Option<u64>> {
    raw.map(|value| {
        value
            .parse::<u64>()
            .map_err(|e| ShippingError::Config(format!("{name}: {e}")))
    })
    .transpose()
}
