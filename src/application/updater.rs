use crate::application::service::ShippingService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Periodically refreshes tracking state for every active shipment.
///
/// Each batch walks the active set strictly sequentially with an inter-item
/// pause, a deliberate, crude rate limiter towards the carrier rather than a
/// scheduler. A failure on one shipment is logged and skipped; the batch
/// always runs to completion unless shutdown is requested.
pub struct TrackingUpdater {
    service: Arc<ShippingService>,
    interval: Duration,
    pause: Duration,
}

impl TrackingUpdater {
    pub fn new(service: Arc<ShippingService>, interval: Duration, pause: Duration) -> Self {
        Self {
            service,
            interval,
            pause,
        }
    }

    /// Runs batches on the configured interval until the shutdown signal
    /// flips (or its sender is dropped). The signal is also honored
    /// mid-batch, between shipments.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut signal = shutdown.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut batch_signal = shutdown.clone();
                    self.run_batch(Some(&mut batch_signal)).await;
                    if stop_requested(Some(&shutdown)) {
                        break;
                    }
                }
                result = signal.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("tracking updater stopped");
    }

    /// One refresh pass over the active set; also serves as the manual
    /// refresh trigger. Returns how many shipments were refreshed.
    pub async fn run_batch(&self, mut shutdown: Option<&mut watch::Receiver<bool>>) -> usize {
        info!("starting tracking refresh batch");

        let shipments = match self.service.active_shipments().await {
            Ok(shipments) => shipments,
            Err(error) => {
                error!(%error, "could not load active shipments");
                return 0;
            }
        };
        info!(count = shipments.len(), "refreshing active shipments");

        let total = shipments.len();
        let mut refreshed = 0;
        for (index, shipment) in shipments.iter().enumerate() {
            if stop_requested(shutdown.as_deref()) {
                info!("shutdown requested, leaving batch early");
                break;
            }

            match self.service.refresh_tracking(shipment).await {
                Ok(_) => refreshed += 1,
                Err(error) => {
                    error!(
                        %error,
                        order_code = %shipment.order_code,
                        tracking_number = shipment.tracking_number.as_deref().unwrap_or(""),
                        "tracking refresh failed, skipping shipment"
                    );
                }
            }

            if index + 1 < total {
                self.pause_between_items(shutdown.as_deref_mut()).await;
            }
        }

        info!(refreshed, "tracking refresh batch complete");
        refreshed
    }

    async fn pause_between_items(&self, shutdown: Option<&mut watch::Receiver<bool>>) {
        match shutdown {
            Some(rx) => {
                tokio::select! {
                    _ = tokio::time::sleep(self.pause) => {}
                    _ = rx.changed() => {}
                }
            }
            None => tokio::time::sleep(self.pause).await,
        }
    }
}

/// A dropped sender counts as a shutdown request.
fn stop_requested(shutdown: Option<&watch::Receiver<bool>>) -> bool {
    shutdown.is_some_and(|rx| *rx.borrow() || rx.has_changed().is_err())
}
