use crate::error::CoreError;
use crate::kv::KeyValueStore;
use crate::models::CategoryFilter;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Key under which the active filter is stored.
pub const FILTER_KEY: &str = "categoriaFiltro";

/// Remembers the last selected category filter across restarts.
#[derive(Clone)]
pub struct PreferenceCache {
    store: Arc<dyn KeyValueStore>,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PreferenceCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// The stored filter, or [`CategoryFilter::All`] when nothing valid is stored.
    pub async fn load(&self) -> CategoryFilter {
        match self.store.get_string(FILTER_KEY).await {
            Ok(Some(value)) => CategoryFilter::from_stored(&value).unwrap_or_else(|| {
                tracing::debug!(value = %value, "ignoring unknown stored filter");
                CategoryFilter::All
            }),
            Ok(None) => CategoryFilter::All,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read filter preference");
                CategoryFilter::All
            }
        }
    }

    pub async fn save(&self, filter: CategoryFilter) -> Result<(), CoreError> {
        self.store.set_string(FILTER_KEY, filter.as_stored()).await
    }

    /// Saves without waiting. Background saves land in call order and
    /// failures are only logged.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn save_in_background(&self, filter: CategoryFilter) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        let previous = pending.take();
        let cache = self.clone();
        *pending = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            if let Err(e) = cache.save(filter).await {
                tracing::warn!(error = %e, %filter, "failed to save filter preference");
            }
        }));
    }

    /// Waits for the background saves issued so far.
    pub async fn flush(&self) {
        let pending = self.pending.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = pending {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use crate::models::Category;

    #[tokio::test]
    async fn test_load_defaults_to_all() {
        let cache = PreferenceCache::new(Arc::new(MemoryKeyValueStore::new()));
        assert_eq!(cache.load().await, CategoryFilter::All);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let cache = PreferenceCache::new(store.clone());
        cache.save(CategoryFilter::Only(Category::Study)).await.unwrap();

        assert_eq!(store.get_string(FILTER_KEY).await.unwrap().as_deref(), Some("estudo"));
        assert_eq!(cache.load().await, CategoryFilter::Only(Category::Study));
    }

    #[tokio::test]
    async fn test_invalid_stored_value_falls_back() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set_string(FILTER_KEY, "lazer").await.unwrap();
        let cache = PreferenceCache::new(store.clone());
        assert_eq!(cache.load().await, CategoryFilter::All);

        store.set_failing(true);
        assert_eq!(cache.load().await, CategoryFilter::All);
    }

    #[tokio::test]
    async fn test_background_saves_keep_call_order() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let cache = PreferenceCache::new(store.clone());
        cache.save_in_background(CategoryFilter::Only(Category::Work));
        cache.save_in_background(CategoryFilter::Only(Category::Personal));
        cache.save_in_background(CategoryFilter::All);
        cache.flush().await;

        assert_eq!(store.get_string(FILTER_KEY).await.unwrap().as_deref(), Some("todos"));
    }

    #[tokio::test]
    async fn test_background_save_failure_is_swallowed() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set_failing(true);
        let cache = PreferenceCache::new(store.clone());
        cache.save_in_background(CategoryFilter::Only(Category::Work));
        cache.flush().await;

        store.set_failing(false);
        assert_eq!(store.get_string(FILTER_KEY).await.unwrap(), None);
    }
}
