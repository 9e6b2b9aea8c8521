mod support;

use std::sync::Arc;

use dynsprite_core::{
    CacacheStore, Dispatcher, DurableStore, MemoryStore, PersistMode, ResourceCache,
};
use support::{FakeFetcher, png_bytes};

fn cache_with(
    fetcher: Arc<FakeFetcher>,
    store: Arc<dyn DurableStore>,
    mode: PersistMode,
) -> ResourceCache<()> {
    let (dispatcher, _pump) = Dispatcher::new();
    ResourceCache::builder(dispatcher, fetcher)
        .store(store)
        .persistence(mode)
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn persisted_bytes_skip_the_network() {
    let store = Arc::new(MemoryStore::new());
    store.set("https://cdn.example/a.png", &png_bytes(12, 12, 7)).await.unwrap();
    let fetcher = FakeFetcher::new();
    let cache = cache_with(Arc::clone(&fetcher), store, PersistMode::ReadOnly);

    let sprite = cache.get_or_fetch("https://cdn.example/a.png").await.unwrap();
    assert_eq!(sprite.width(), 12);
    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(cache.stats().store_hits, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn read_write_persists_downloads_for_later_instances() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn DurableStore> = Arc::new(CacacheStore::new(dir.path().to_path_buf()));

    let first_fetcher = FakeFetcher::new();
    let first = cache_with(Arc::clone(&first_fetcher), Arc::clone(&store), PersistMode::ReadWrite);
    assert!(first.get_or_fetch("https://cdn.example/b.png").await.is_some());
    assert_eq!(first_fetcher.total_calls(), 1);
    assert!(store.get("https://cdn.example/b.png").await.unwrap().is_some());

    let second_fetcher = FakeFetcher::new();
    let second = cache_with(Arc::clone(&second_fetcher), store, PersistMode::ReadWrite);
    assert!(second.get_or_fetch("https://cdn.example/b.png").await.is_some());
    assert_eq!(second_fetcher.total_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn read_only_never_writes() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::new();
    let cache = cache_with(Arc::clone(&fetcher), Arc::clone(&store) as _, PersistMode::ReadOnly);

    assert!(cache.get_or_fetch("k").await.is_some());
    assert_eq!(fetcher.total_calls(), 1);
    assert!(store.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disabled_persistence_ignores_store() {
    let store = Arc::new(MemoryStore::new());
    store.set("k", &png_bytes(4, 4, 1)).await.unwrap();
    let fetcher = FakeFetcher::new();
    let cache = cache_with(Arc::clone(&fetcher), Arc::clone(&store) as _, PersistMode::Disabled);

    let sprite = cache.get_or_fetch("k").await.unwrap();
    assert_eq!(sprite.width(), 16);
    assert_eq!(fetcher.total_calls(), 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreadable_persisted_bytes_fall_back_to_network() {
    let store = Arc::new(MemoryStore::new());
    store.set("k", b"not an image").await.unwrap();
    let fetcher = FakeFetcher::new();
    let cache = cache_with(Arc::clone(&fetcher), Arc::clone(&store) as _, PersistMode::ReadWrite);

    assert!(cache.get_or_fetch("k").await.is_some());
    assert_eq!(fetcher.total_calls(), 1);
    let repaired = store.get("k").await.unwrap().unwrap();
    assert_ne!(repaired, b"not an image".to_vec());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_download_is_not_persisted() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::new();
    fetcher.fail("k");
    let cache = cache_with(Arc::clone(&fetcher), Arc::clone(&store) as _, PersistMode::ReadWrite);

    assert!(cache.get_or_fetch("k").await.is_none());
    assert!(store.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn undecodable_download_is_not_persisted() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::new();
    fetcher.serve_garbage("k");
    let cache = cache_with(Arc::clone(&fetcher), Arc::clone(&store) as _, PersistMode::ReadWrite);

    assert!(cache.get_or_fetch("k").await.is_none());
    assert_eq!(cache.stats().failures, 1);
    assert!(store.is_empty());
}
