//! Deduplicating sprite cache.
//!
//! Lookup order is memory → durable store → network. Concurrent requests for
//! the same key share one in-flight fetch (singleflight); completion is
//! delivered to subscribers through the [`Dispatcher`], so callbacks always
//! run on the thread that owns `S`.

mod entry;
pub mod events;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::dispatch::{Dispatcher, panic_message};
use crate::error::{Result, SpriteError};
use crate::infra::{DurableStore, ImageDecoder, ResourceFetcher, SpriteDecoder};
use crate::settings::PersistMode;
use crate::sprite::Sprite;

use entry::EntryState;
pub use events::{
    AllFinishedHandler, SingleFinishedHandler, SpriteCallback,
    all_finished_handler, single_finished_handler, sprite_callback,
};
use events::{EventHooks, push_unique};

/// Point-in-time counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub ready_entries: usize,
    pub pending_entries: usize,
    pub pending_downloads: usize,
    pub network_fetches: u64,
    pub store_hits: u64,
    pub memory_hits: u64,
    /// Requests that joined a fetch already in flight.
    pub joined_requests: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct CacheCounters {
    network_fetches: AtomicU64,
    store_hits: AtomicU64,
    memory_hits: AtomicU64,
    joined_requests: AtomicU64,
    failures: AtomicU64,
}

struct CacheState<S> {
    entries: HashMap<String, EntryState>,
    subscribers: HashMap<String, Vec<SpriteCallback<S>>>,
    hooks: EventHooks<S>,
}

struct CacheInner<S> {
    state: Mutex<CacheState<S>>,
    // Only written while `state` is locked so zero crossings line up with
    // entry transitions.
    pending: AtomicUsize,
    dispatcher: Dispatcher<S>,
    fetcher: Arc<dyn ResourceFetcher>,
    decoder: Arc<dyn SpriteDecoder>,
    store: Option<Arc<dyn DurableStore>>,
    persistence: PersistMode,
    runtime: Handle,
    counters: CacheCounters,
}

enum Ticket {
    Immediate(Option<Arc<Sprite>>),
    Waiting(oneshot::Receiver<Option<Arc<Sprite>>>),
}

/// Shared handle to the cache. Cloning is cheap; all clones see the same
/// entries.
pub struct ResourceCache<S> {
    inner: Arc<CacheInner<S>>,
}

impl<S> Clone for ResourceCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for ResourceCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (ready, pending) = {
            let state = self.inner.state.lock();
            let ready = state.entries.values().filter(|e| e.is_ready()).count();
            (ready, state.entries.len() - ready)
        };
        f.debug_struct("ResourceCache")
            .field("ready_entries", &ready)
            .field("pending_entries", &pending)
            .field(
                "pending_downloads",
                &self.inner.pending.load(Ordering::SeqCst),
            )
            .field("persistence", &self.inner.persistence)
            .field("has_store", &self.inner.store.is_some())
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}

pub struct ResourceCacheBuilder<S> {
    dispatcher: Dispatcher<S>,
    fetcher: Arc<dyn ResourceFetcher>,
    decoder: Arc<dyn SpriteDecoder>,
    store: Option<Arc<dyn DurableStore>>,
    persistence: PersistMode,
    runtime: Option<Handle>,
}

impl<S> fmt::Debug for ResourceCacheBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCacheBuilder")
            .field("persistence", &self.persistence)
            .field("has_store", &self.store.is_some())
            .field("has_runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: 'static> ResourceCacheBuilder<S> {
    pub fn decoder(mut self, decoder: Arc<dyn SpriteDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn persistence(mut self, mode: PersistMode) -> Self {
        self.persistence = mode;
        self
    }

    /// Runtime the background fetch tasks are spawned on. Defaults to the
    /// runtime current at `build` time.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<ResourceCache<S>> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| {
                SpriteError::Internal(format!(
                    "resource cache needs a tokio runtime: {e}"
                ))
            })?,
        };

        let persistence = self.persistence.effective();
        let store = if persistence.reads() { self.store } else { None };
        if persistence.reads() && store.is_none() {
            debug!(?persistence, "no durable store configured; cache is memory only");
        }

        Ok(ResourceCache {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    subscribers: HashMap::new(),
                    hooks: EventHooks::default(),
                }),
                pending: AtomicUsize::new(0),
                dispatcher: self.dispatcher,
                fetcher: self.fetcher,
                decoder: self.decoder,
                store,
                persistence,
                runtime,
                counters: CacheCounters::default(),
            }),
        })
    }
}

impl<S: 'static> ResourceCache<S> {
    pub fn builder(
        dispatcher: Dispatcher<S>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> ResourceCacheBuilder<S> {
        ResourceCacheBuilder {
            dispatcher,
            fetcher,
            decoder: Arc::new(ImageDecoder),
            store: None,
            persistence: PersistMode::default(),
            runtime: None,
        }
    }

    /// Request `key`, fetching it if it is not cached yet.
    ///
    /// The request is registered immediately (it counts towards the pending
    /// downloads and joins or starts a fetch before this returns); awaiting
    /// the future only waits for the outcome. Dropping the future does not
    /// cancel the fetch. Resolves to `None` for an empty key or a failed
    /// fetch.
    pub fn get_or_fetch(
        &self,
        key: &str,
    ) -> impl Future<Output = Option<Arc<Sprite>>> + Send + 'static + use<S> {
        let ticket = self.begin(key);
        async move {
            match ticket {
                Ticket::Immediate(resolved) => resolved,
                Ticket::Waiting(rx) => rx.await.unwrap_or(None),
            }
        }
    }

    /// Subscribe `callback` to `key`, then request it.
    pub fn get_or_fetch_with(
        &self,
        key: &str,
        callback: SpriteCallback<S>,
    ) -> impl Future<Output = Option<Arc<Sprite>>> + Send + 'static + use<S> {
        self.subscribe(key, callback);
        self.get_or_fetch(key)
    }

    /// Request every key; resolves once each request has settled, with the
    /// outcomes in input order.
    pub fn fetch_all<I, K>(
        &self,
        keys: I,
    ) -> impl Future<Output = Vec<Option<Arc<Sprite>>>> + Send + 'static + use<S, I, K>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let requests: Vec<_> = keys
            .into_iter()
            .map(|key| self.get_or_fetch(key.as_ref()))
            .collect();
        join_all(requests)
    }

    /// Ready sprite for `key`, if any. Never fetches.
    pub fn get_cached(&self, key: &str) -> Option<Arc<Sprite>> {
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .and_then(|entry| entry.ready().cloned())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .is_some_and(EntryState::is_ready)
    }

    /// Register `callback` for the next resolution of `key`. Returns `false`
    /// when the key is empty or this exact callback is already registered.
    pub fn subscribe(&self, key: &str, callback: SpriteCallback<S>) -> bool {
        if key.is_empty() {
            return false;
        }
        let mut state = self.inner.state.lock();
        let list = state.subscribers.entry(key.to_string()).or_default();
        push_unique(list, callback)
    }

    /// Remove `callback` from every key it is subscribed to.
    pub fn remove_subscription(&self, callback: &SpriteCallback<S>) {
        let mut state = self.inner.state.lock();
        state.subscribers.retain(|_, list| {
            list.retain(|existing| !Arc::ptr_eq(existing, callback));
            !list.is_empty()
        });
    }

    pub fn on_single_finished(&self, handler: SingleFinishedHandler<S>) {
        let mut state = self.inner.state.lock();
        push_unique(&mut state.hooks.single_finished, handler);
    }

    pub fn on_all_pending_finished(&self, handler: AllFinishedHandler<S>) {
        let mut state = self.inner.state.lock();
        push_unique(&mut state.hooks.all_finished, handler);
    }

    /// Drop every global event handler. Per-key subscriptions are kept.
    pub fn clear_events(&self) {
        self.inner.state.lock().hooks.clear();
    }

    /// Requests that have not settled yet.
    pub fn pending_downloads(&self) -> usize {
        let _state = self.inner.state.lock();
        self.inner.pending.load(Ordering::SeqCst)
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.inner.dispatcher
    }

    pub fn persistence(&self) -> PersistMode {
        self.inner.persistence
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        let ready_entries =
            state.entries.values().filter(|e| e.is_ready()).count();
        let counters = &self.inner.counters;
        CacheStats {
            ready_entries,
            pending_entries: state.entries.len() - ready_entries,
            pending_downloads: self.inner.pending.load(Ordering::SeqCst),
            network_fetches: counters.network_fetches.load(Ordering::Relaxed),
            store_hits: counters.store_hits.load(Ordering::Relaxed),
            memory_hits: counters.memory_hits.load(Ordering::Relaxed),
            joined_requests: counters.joined_requests.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
        }
    }

    fn begin(&self, key: &str) -> Ticket {
        if key.is_empty() {
            debug!(err = %SpriteError::EmptyKey, "rejecting sprite request");
            return Ticket::Immediate(None);
        }

        let inner = &self.inner;
        let mut state = inner.state.lock();
        inner.pending.fetch_add(1, Ordering::SeqCst);

        match state.entries.get_mut(key) {
            Some(EntryState::Ready(sprite)) => {
                let sprite = Arc::clone(sprite);
                inner.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
                inner.notify(&mut state, key, Some(Arc::clone(&sprite)));
                inner.settle_locked(&mut state, 1);
                Ticket::Immediate(Some(sprite))
            }
            Some(EntryState::Pending { requests, waiters }) => {
                let (tx, rx) = oneshot::channel();
                *requests += 1;
                waiters.push(tx);
                inner.counters.joined_requests.fetch_add(1, Ordering::Relaxed);
                debug!(key, requests = *requests, "joining in-flight fetch");
                Ticket::Waiting(rx)
            }
            None => {
                let (tx, rx) = oneshot::channel();
                state
                    .entries
                    .insert(key.to_string(), EntryState::pending(tx));
                debug!(key, "starting fetch");
                inner
                    .runtime
                    .spawn(Arc::clone(inner).resolve(key.to_string()));
                Ticket::Waiting(rx)
            }
        }
    }
}

impl<S: 'static> CacheInner<S> {
    async fn resolve(self: Arc<Self>, key: String) {
        let outcome = match AssertUnwindSafe(self.load(&key)).catch_unwind().await
        {
            Ok(outcome) => outcome,
            Err(payload) => Err(SpriteError::Internal(format!(
                "fetch task panicked: {}",
                panic_message(payload.as_ref())
            ))),
        };
        self.complete(&key, outcome);
    }

    async fn load(&self, key: &str) -> Result<Arc<Sprite>> {
        if let Some(sprite) = self.load_persisted(key).await {
            self.counters.store_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(sprite);
        }

        self.counters.network_fetches.fetch_add(1, Ordering::Relaxed);
        let bytes = self.fetcher.fetch(key).await?;
        let (decoded, bytes) = self.decode(key, bytes).await;
        let sprite = Arc::new(decoded?);

        if self.persistence.writes()
            && let Some(store) = &self.store
            && let Err(e) = store.set(key, &bytes).await
        {
            warn!(key, err = %e, "persisting sprite bytes failed");
        }

        Ok(sprite)
    }

    async fn load_persisted(&self, key: &str) -> Option<Arc<Sprite>> {
        if !self.persistence.reads() {
            return None;
        }
        let store = self.store.as_ref()?;

        let bytes = match store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, err = %e, "durable store read failed");
                return None;
            }
        };

        match self.decode(key, bytes).await.0 {
            Ok(sprite) => {
                debug!(key, "sprite restored from durable store; skipping download");
                Some(Arc::new(sprite))
            }
            Err(e) => {
                warn!(key, err = %e, "persisted sprite bytes unreadable; refetching");
                None
            }
        }
    }

    /// Decode on the blocking pool, handing the bytes back for persistence.
    async fn decode(&self, key: &str, bytes: Vec<u8>) -> (Result<Sprite>, Vec<u8>) {
        let decoder = Arc::clone(&self.decoder);
        let owned_key = key.to_string();
        let task = tokio::task::spawn_blocking(move || {
            let decoded = decoder.decode(&owned_key, &bytes);
            (decoded, bytes)
        });
        match task.await {
            Ok(out) => out,
            Err(e) => (
                Err(SpriteError::decode(key, format!("decode task failed: {e}"))),
                Vec::new(),
            ),
        }
    }

    fn complete(self: &Arc<Self>, key: &str, outcome: Result<Arc<Sprite>>) {
        let mut state = self.state.lock();
        let Some(EntryState::Pending { requests, waiters }) =
            state.entries.remove(key)
        else {
            error!(key, "fetch settled without a pending entry");
            return;
        };

        let resolved = match outcome {
            Ok(sprite) => {
                info!(
                    key,
                    width = sprite.width(),
                    height = sprite.height(),
                    requests,
                    "sprite ready"
                );
                state
                    .entries
                    .insert(key.to_string(), EntryState::Ready(Arc::clone(&sprite)));
                Some(sprite)
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(key, err = %e, requests, "sprite fetch failed; entry dropped");
                None
            }
        };

        // Queue the notifications before waking awaiting callers so that a
        // caller draining right after its await observes them.
        self.notify(&mut state, key, resolved.clone());
        self.settle_locked(&mut state, requests);
        drop(state);

        for waiter in waiters {
            let _ = waiter.send(resolved.clone());
        }
    }

    /// Caller holds the state lock. The key's subscribers are detached here,
    /// so callbacks registered afterwards wait for the next resolution.
    fn notify(
        self: &Arc<Self>,
        state: &mut CacheState<S>,
        key: &str,
        resolved: Option<Arc<Sprite>>,
    ) {
        let callbacks = state.subscribers.remove(key).unwrap_or_default();
        let inner = Arc::clone(self);
        let key = key.to_string();
        self.dispatcher.enqueue(move |owner: &mut S| {
            inner.deliver(owner, &key, resolved, callbacks)
        });
    }

    /// Caller holds the state lock.
    fn settle_locked(self: &Arc<Self>, _state: &mut CacheState<S>, requests: usize) {
        let current = self.pending.load(Ordering::SeqCst);
        if current < requests {
            error!(current, requests, "pending download count would go negative");
        }
        let next = current.saturating_sub(requests);
        self.pending.store(next, Ordering::SeqCst);

        if current > 0 && next == 0 {
            debug!("all pending sprite downloads finished");
            let inner = Arc::clone(self);
            self.dispatcher
                .enqueue(move |owner: &mut S| inner.deliver_all_finished(owner));
        }
    }

    // Runs on the owning thread.
    fn deliver(
        &self,
        owner: &mut S,
        key: &str,
        resolved: Option<Arc<Sprite>>,
        callbacks: Vec<SpriteCallback<S>>,
    ) {
        let hooks = self.state.lock().hooks.single_finished.clone();

        for hook in &hooks {
            run_isolated(key, || hook(owner, key, resolved.as_ref()));
        }
        for callback in &callbacks {
            run_isolated(key, || callback(owner, resolved.clone()));
        }
    }

    // Runs on the owning thread.
    fn deliver_all_finished(&self, owner: &mut S) {
        let hooks = self.state.lock().hooks.all_finished.clone();
        for hook in &hooks {
            run_isolated("<all>", || hook(owner));
        }
    }
}

fn run_isolated(key: &str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        let err = SpriteError::CallbackFailed(panic_message(payload.as_ref()));
        error!(key, err = %err, "sprite callback panicked");
    }
}
