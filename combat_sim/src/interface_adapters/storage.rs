// JSON files on disk: saved world data and item packs.

use crate::domain::definitions::{PackFile, PackRegistry};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Errors from reading or writing world files.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "io error: {e}"),
            StorageError::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Reads saved world data. A missing file is a new world.
pub async fn load_world_data(path: &Path) -> Result<Option<Value>, StorageError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no saved world");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&text)?))
}

/// Writes world data next to the target, then swaps it in.
pub async fn save_world_data(path: &Path, data: &Value) -> Result<(), StorageError> {
    let text = serde_json::to_string_pretty(data)?;
    let staging = path.with_extension("json.tmp");
    tokio::fs::write(&staging, text).await?;
    tokio::fs::rename(&staging, path).await?;
    info!(path = %path.display(), "world saved");
    Ok(())
}

pub async fn load_pack(path: &Path) -> Result<PackRegistry, StorageError> {
    let text = tokio::fs::read_to_string(path).await?;
    let file: PackFile = serde_json::from_str(&text)?;
    let pack = PackRegistry::from(file);
    info!(path = %path.display(), items = pack.len(), "pack loaded");
    Ok(pack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("combat_sim-{}-{name}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn when_file_is_missing_then_world_is_new() {
        let path = scratch_path("missing.json");
        let loaded = load_world_data(&path).await.expect("missing file is not an error");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn when_world_is_saved_then_it_loads_back() {
        let path = scratch_path("world.json");
        let data = serde_json::json!({ "entityCount": 0 });
        save_world_data(&path, &data).await.expect("save should succeed");
        let loaded = load_world_data(&path).await.expect("load should succeed");
        assert_eq!(loaded, Some(data));
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn when_file_is_not_json_then_load_fails() {
        let path = scratch_path("garbage.json");
        tokio::fs::write(&path, "entityCount = 3").await.expect("write");
        let result = load_world_data(&path).await;
        assert!(matches!(result, Err(StorageError::Json(_))));
        let _ = tokio::fs::remove_file(&path).await;
    }
}
