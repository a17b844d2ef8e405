#![cfg(test)]
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::storage::InventoryBackend;

/// In-memory backend for store tests.
#[derive(Default)]
pub struct MemoryBackend {
    bytes: Mutex<Option<Vec<u8>>>,
    fail_writes: bool,
}

impl MemoryBackend {
    pub fn with_bytes(bytes: &[u8]) -> Self {
        Self { bytes: Mutex::new(Some(bytes.to_vec())), fail_writes: false }
    }

    pub fn failing_writes() -> Self {
        Self { bytes: Mutex::new(None), fail_writes: true }
    }

    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.bytes.lock().unwrap().clone()
    }
}

#[async_trait]
impl InventoryBackend for MemoryBackend {
    async fn read(&self) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(self.snapshot())
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), ServiceError> {
        if self.fail_writes {
            return Err(ServiceError::StorageWrite("disk full".into()));
        }
        *self.bytes.lock().unwrap() = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}
