pub mod inventory_store;
pub mod json_file;

use async_trait::async_trait;

use crate::errors::ServiceError;

pub use inventory_store::InventoryStore;
pub use json_file::JsonFileBackend;

/// Raw byte storage behind the inventory store.
/// Implementations can be file-backed, in-memory, or remote.
#[async_trait]
pub trait InventoryBackend: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    async fn read(&self) -> Result<Option<Vec<u8>>, ServiceError>;
    /// Replace the stored bytes as a whole; readers never observe a partial write.
    async fn write(&self, bytes: &[u8]) -> Result<(), ServiceError>;
    /// Human readable location used in logs.
    fn describe(&self) -> String;
}
