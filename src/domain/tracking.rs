use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw tracking event as reported by the carrier, before it is attached to
/// a shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierEvent {
    pub event_date: DateTime<Utc>,
    pub status: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub carrier_event_id: Option<String>,
}

/// A persisted tracking event, owned by exactly one shipment.
///
/// `(event_date, status)` is the natural deduplication key within a
/// shipment's event list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub shipment_id: Uuid,
    pub event_date: DateTime<Utc>,
    pub status: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub carrier_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TrackingEvent {
    pub fn from_carrier(shipment_id: Uuid, event: &CarrierEvent, now: DateTime<Utc>) -> Self {
        Self {
            shipment_id,
            event_date: event.event_date,
            status: event.status.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            carrier_event_id: event.carrier_event_id.clone(),
            created_at: now,
        }
    }

    /// Natural-key match against a freshly fetched carrier event.
    pub fn matches(&self, event: &CarrierEvent) -> bool {
        self.event_date == event.event_date && self.status == event.status
    }
}
