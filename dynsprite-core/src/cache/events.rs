//! Subscriber and event hook types.
//!
//! Every callback runs on the owning thread with mutable access to its state
//! `S`. Callbacks are compared by `Arc` identity, so registering the same
//! handle twice is a no-op.

use std::sync::Arc;

use crate::sprite::Sprite;

/// Completion callback for one key. Receives `None` when the fetch failed.
pub type SpriteCallback<S> =
    Arc<dyn Fn(&mut S, Option<Arc<Sprite>>) + Send + Sync + 'static>;

/// Fired once per key resolution, before that key's subscribers.
pub type SingleFinishedHandler<S> =
    Arc<dyn Fn(&mut S, &str, Option<&Arc<Sprite>>) + Send + Sync + 'static>;

/// Fired every time the pending download count returns to zero.
pub type AllFinishedHandler<S> = Arc<dyn Fn(&mut S) + Send + Sync + 'static>;

/// Wrap a closure as a [`SpriteCallback`].
pub fn sprite_callback<S, F>(f: F) -> SpriteCallback<S>
where
    F: Fn(&mut S, Option<Arc<Sprite>>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`SingleFinishedHandler`].
pub fn single_finished_handler<S, F>(f: F) -> SingleFinishedHandler<S>
where
    F: Fn(&mut S, &str, Option<&Arc<Sprite>>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as an [`AllFinishedHandler`].
pub fn all_finished_handler<S, F>(f: F) -> AllFinishedHandler<S>
where
    F: Fn(&mut S) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) struct EventHooks<S> {
    pub(crate) single_finished: Vec<SingleFinishedHandler<S>>,
    pub(crate) all_finished: Vec<AllFinishedHandler<S>>,
}

impl<S> Default for EventHooks<S> {
    fn default() -> Self {
        Self {
            single_finished: Vec::new(),
            all_finished: Vec::new(),
        }
    }
}

impl<S> EventHooks<S> {
    pub(crate) fn clear(&mut self) {
        self.single_finished.clear();
        self.all_finished.clear();
    }
}

/// Push `callback` unless the very same handle is already registered.
pub(crate) fn push_unique<T: ?Sized>(list: &mut Vec<Arc<T>>, callback: Arc<T>) -> bool {
    if list.iter().any(|existing| Arc::ptr_eq(existing, &callback)) {
        return false;
    }
    list.push(callback);
    true
}
