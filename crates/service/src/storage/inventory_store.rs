use std::sync::Arc;

use models::{inventory, Catalog, Inventory};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{InventoryBackend, JsonFileBackend};
use crate::errors::ServiceError;
use crate::metrics;

/// Owner of the persisted inventory.
///
/// Reads parse a full snapshot of the backing store. Writes go through
/// [`InventoryStore::update`], which holds a single writer lock across
/// load, mutate and save, so concurrent writers cannot lose each other's
/// changes.
pub struct InventoryStore {
    backend: Arc<dyn InventoryBackend>,
    catalog: Arc<Catalog>,
    write_lock: Mutex<()>,
}

impl InventoryStore {
    pub fn with_backend(backend: Arc<dyn InventoryBackend>, catalog: Arc<Catalog>) -> Self {
        Self { backend, catalog, write_lock: Mutex::new(()) }
    }

    /// Open the JSON file at `path`. Creates it with an empty mapping if missing
    /// and refuses to start on a file that does not parse.
    pub async fn open<P: Into<std::path::PathBuf>>(path: P, catalog: Arc<Catalog>) -> Result<Arc<Self>, ServiceError> {
        let store = Self::with_backend(Arc::new(JsonFileBackend::new(path)), catalog);
        match store.backend.read().await? {
            Some(raw) => {
                let inv = store.load().await?;
                store.persist_repairs(&raw, &inv).await?;
                info!(
                    location = %store.backend.describe(),
                    services = inv.len(),
                    accounts = inventory::total_accounts(&inv),
                    "inventory loaded"
                );
            }
            None => {
                store.save(&Inventory::new()).await?;
                info!(location = %store.backend.describe(), "initialized empty inventory");
            }
        }
        Ok(Arc::new(store))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Write back the reconciled form when it differs from what was read, so
    /// repaired ids and defaulted fields stay fixed from then on.
    async fn persist_repairs(&self, raw: &[u8], inv: &Inventory) -> Result<(), ServiceError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        let normalized = serde_json::to_vec_pretty(inv).map_err(|e| ServiceError::StorageWrite(e.to_string()))?;
        if normalized != raw {
            self.save(inv).await?;
            info!(location = %self.backend.describe(), "inventory normalized on open");
        }
        Ok(())
    }

    /// Parse the current snapshot. Empty when nothing was stored yet.
    pub async fn load(&self) -> Result<Inventory, ServiceError> {
        let bytes = match self.backend.read().await? {
            Some(b) => b,
            None => return Ok(Inventory::new()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            warn!(location = %self.backend.describe(), "inventory file is blank; treating as empty");
            return Ok(Inventory::new());
        }
        let mut inv: Inventory = serde_json::from_slice(&bytes).map_err(|e| {
            error!(location = %self.backend.describe(), err = %e, "inventory file is not valid JSON");
            ServiceError::StorageCorruption(e.to_string())
        })?;
        inventory::reconcile(&mut inv, &self.catalog);
        Ok(inv)
    }

    /// Serialize and replace the whole inventory.
    pub async fn save(&self, inv: &Inventory) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(inv).map_err(|e| ServiceError::StorageWrite(e.to_string()))?;
        match self.backend.write(&data).await {
            Ok(()) => {
                metrics::STORE_WRITES_TOTAL.inc();
                Ok(())
            }
            Err(e) => {
                metrics::STORE_WRITE_FAILURES_TOTAL.inc();
                error!(location = %self.backend.describe(), err = %e, "inventory save failed");
                Err(e)
            }
        }
    }

    /// Apply a mutation under the writer lock and persist the result.
    ///
    /// When `f` fails nothing is written and the stored bytes stay untouched.
    pub async fn update<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Inventory) -> Result<T, ServiceError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut inv = self.load().await?;
        let out = f(&mut inv)?;
        inventory::reconcile(&mut inv, &self.catalog);
        self.save(&inv).await?;
        Ok(out)
    }
}
