use std::sync::Arc;

use tokio::sync::oneshot;

use crate::sprite::Sprite;

pub(crate) type Waiter = oneshot::Sender<Option<Arc<Sprite>>>;

/// Lifecycle of a key inside the cache.
///
/// Failures are never stored: a failed fetch removes its entry so the next
/// request starts clean.
pub(crate) enum EntryState {
    /// A fetch task is in flight. `requests` counts every `get_or_fetch`
    /// call riding on it (leader included); each is settled when the fetch
    /// settles.
    Pending {
        requests: usize,
        waiters: Vec<Waiter>,
    },
    Ready(Arc<Sprite>),
}

impl EntryState {
    pub(crate) fn pending(first: Waiter) -> Self {
        Self::Pending {
            requests: 1,
            waiters: vec![first],
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub(crate) fn ready(&self) -> Option<&Arc<Sprite>> {
        match self {
            Self::Ready(sprite) => Some(sprite),
            Self::Pending { .. } => None,
        }
    }
}
