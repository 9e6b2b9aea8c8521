//! One-shot wiring of the dispatcher, fetcher, decoder, store and cache.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::info;

use crate::cache::ResourceCache;
use crate::dispatch::{Dispatcher, MainThreadPump};
use crate::error::Result;
use crate::infra::{
    CacacheStore, DurableStore, HttpFetcher, ImageDecoder, MemoryStore,
    ResourceFetcher,
};
use crate::settings::{CacheSettings, FetchSettings};

/// Everything a consumer needs, built once on the owning thread and handed
/// around by reference or clone.
pub struct SpriteServices<S> {
    dispatcher: Dispatcher<S>,
    pump: MainThreadPump<S>,
    cache: ResourceCache<S>,
    store: Option<Arc<dyn DurableStore>>,
}

impl<S> fmt::Debug for SpriteServices<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpriteServices")
            .field("pump", &self.pump)
            .field("cache", &self.cache)
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

impl<S: 'static> SpriteServices<S> {
    /// Build with the HTTP fetcher. Must be called on the owning thread: the
    /// returned pump is bound to it.
    pub fn build(
        cache: &CacheSettings,
        fetch: &FetchSettings,
        runtime: Handle,
    ) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(fetch)?);
        Self::build_with_fetcher(cache, fetcher, runtime)
    }

    pub fn build_with_fetcher(
        cache: &CacheSettings,
        fetcher: Arc<dyn ResourceFetcher>,
        runtime: Handle,
    ) -> Result<Self> {
        let persistence = cache.persistence.effective();
        let store: Option<Arc<dyn DurableStore>> = if !persistence.reads() {
            None
        } else if let Some(root) = &cache.root {
            Some(Arc::new(CacacheStore::new(root.clone())))
        } else {
            Some(Arc::new(MemoryStore::new()))
        };

        let (dispatcher, pump) = Dispatcher::new();
        let mut builder = ResourceCache::builder(dispatcher.clone(), fetcher)
            .decoder(Arc::new(ImageDecoder))
            .persistence(persistence)
            .runtime(runtime);
        if let Some(store) = &store {
            builder = builder.store(Arc::clone(store));
        }
        let cache_handle = builder.build()?;

        info!(
            ?persistence,
            root = ?cache.root,
            "sprite services ready"
        );

        Ok(Self {
            dispatcher,
            pump,
            cache: cache_handle,
            store,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    pub fn cache(&self) -> &ResourceCache<S> {
        &self.cache
    }

    pub fn pump_mut(&mut self) -> &mut MainThreadPump<S> {
        &mut self.pump
    }

    pub fn store(&self) -> Option<&Arc<dyn DurableStore>> {
        self.store.as_ref()
    }

    pub fn into_parts(self) -> (Dispatcher<S>, MainThreadPump<S>, ResourceCache<S>) {
        (self.dispatcher, self.pump, self.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PersistMode;

    #[tokio::test]
    async fn disabled_persistence_builds_without_store() {
        let settings = CacheSettings {
            persistence: PersistMode::Disabled,
            root: None,
        };
        let services: SpriteServices<()> =
            SpriteServices::build(&settings, &FetchSettings::default(), Handle::current())
                .unwrap();
        assert!(services.store().is_none());
        assert_eq!(services.cache().persistence(), PersistMode::Disabled);
    }

    #[tokio::test]
    async fn rooted_cache_uses_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings {
            persistence: PersistMode::ReadWrite,
            root: Some(dir.path().to_path_buf()),
        };
        let services: SpriteServices<()> =
            SpriteServices::build(&settings, &FetchSettings::default(), Handle::current())
                .unwrap();
        assert!(services.store().is_some());
        assert!(services.cache().persistence().reads());
    }
}
