//! Async wrappers that move blocking file work onto the blocking pool.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use super::JsonStore;

impl JsonStore {
    /// Async [`JsonStore::load`]; the calling task is never blocked on disk I/O.
    pub async fn load_async<T>(&self, path: impl Into<PathBuf>, default: T) -> T
    where
        T: DeserializeOwned + Send + 'static,
    {
        let store = self.clone();
        let path = path.into();
        match tokio::task::spawn_blocking(move || store.load_existing::<T>(&path)).await {
            Ok(value) => value.unwrap_or(default),
            Err(e) => {
                error!(error = %e, "Load task join error");
                default
            },
        }
    }

    /// Async [`JsonStore::save`].
    pub async fn save_async<T>(&self, value: T, path: impl Into<PathBuf>) -> bool
    where
        T: Serialize + Send + 'static,
    {
        let store = self.clone();
        let path = path.into();
        match tokio::task::spawn_blocking(move || store.save(&value, &path)).await {
            Ok(saved) => saved,
            Err(e) => {
                error!(error = %e, "Save task join error");
                false
            },
        }
    }
}
