pub mod andreani;
pub mod in_memory;
pub mod mock;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
