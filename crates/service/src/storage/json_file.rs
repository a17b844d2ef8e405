use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use super::InventoryBackend;
use crate::errors::ServiceError;

/// Single JSON file, replaced atomically via write-to-temp then rename.
#[derive(Clone, Debug)]
pub struct JsonFileBackend {
    file_path: PathBuf,
}

impl JsonFileBackend {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { file_path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "inventory".into());
        self.file_path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4()))
    }
}

#[async_trait]
impl InventoryBackend for JsonFileBackend {
    async fn read(&self) -> Result<Option<Vec<u8>>, ServiceError> {
        match fs::read(&self.file_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServiceError::StorageCorruption(format!("{}: {e}", self.file_path.display()))),
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), ServiceError> {
        let write_err = |e: std::io::Error| ServiceError::StorageWrite(format!("{}: {e}", self.file_path.display()));
        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let tmp = self.temp_path();
        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, &self.file_path).await
        }
        .await;
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        debug!(path = %self.file_path.display(), bytes = bytes.len(), "inventory file replaced");
        Ok(())
    }

    fn describe(&self) -> String {
        self.file_path.display().to_string()
    }
}
