use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShippingError>;

#[derive(Error, Debug)]
pub enum ShippingError {
    #[error("carrier authentication failed: {0}")]
    Auth(String),
    #[error("carrier error: {0}")]
    Carrier(String),
    #[error("shipment not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Store(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("database error: {0}")]
    Database(#[from] rocksdb::Error),
}
