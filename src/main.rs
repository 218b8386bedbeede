use clap::Parser;
use envios::application::service::ShippingService;
use envios::application::updater::TrackingUpdater;
use envios::config::Config;
use envios::domain::ports::{CarrierRef, ShipmentStoreRef, TrackingEventStoreRef};
use envios::infrastructure::andreani::AndreaniClient;
use envios::infrastructure::in_memory::{InMemoryShipmentStore, InMemoryTrackingEventStore};
use envios::infrastructure::mock::MockCarrier;
use miette::{IntoDiagnostic, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run a single tracking refresh batch and exit
    #[arg(long)]
    once: bool,

    /// Force the mock carrier regardless of configuration
    #[arg(long)]
    mock: bool,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().into_diagnostic()?;

    let mock_enabled = cli.mock || config.mock_enabled;
    let carrier: CarrierRef = if mock_enabled {
        Arc::new(MockCarrier::new())
    } else {
        Arc::new(AndreaniClient::new(
            config.carrier.clone(),
            config.shop_origin.clone(),
        ))
    };

    let (shipments, events) = build_stores(&cli).into_diagnostic()?;

    let service = Arc::new(ShippingService::new(
        shipments,
        events,
        carrier,
        config.shop_origin.clone(),
    ));
    let updater = TrackingUpdater::new(service, config.poll_interval, config.item_pause);

    info!(
        service = "shipping-service",
        mock = mock_enabled,
        poll_interval_secs = config.poll_interval.as_secs(),
        "shipping service starting"
    );

    if cli.once {
        updater.run_batch(None).await;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { updater.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await.into_diagnostic()?;
    info!("shutdown requested");
    shutdown_tx.send(true).ok();
    handle.await.into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn build_stores(cli: &Cli) -> envios::error::Result<(ShipmentStoreRef, TrackingEventStoreRef)> {
    use envios::infrastructure::rocksdb::RocksDBStore;

    if let Some(db_path) = &cli.db_path {
        let store = RocksDBStore::open(db_path)?;
        return Ok((Arc::new(store.clone()), Arc::new(store)));
    }
    Ok(in_memory_stores())
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_stores(_cli: &Cli) -> envios::error::Result<(ShipmentStoreRef, TrackingEventStoreRef)> {
    Ok(in_memory_stores())
}

fn in_memory_stores() -> (ShipmentStoreRef, TrackingEventStoreRef) {
    (
        Arc::new(InMemoryShipmentStore::new()),
        Arc::new(InMemoryTrackingEventStore::new()),
    )
}
