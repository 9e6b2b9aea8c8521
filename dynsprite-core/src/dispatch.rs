//! Cross-thread hand-off to the thread that owns render state.
//!
//! [`Dispatcher`] is the cloneable, `Send + Sync` producer half: background
//! tasks push closures into it. [`MainThreadPump`] is the consumer half and is
//! deliberately `!Send`, so it stays on the thread that created it. That
//! thread calls [`MainThreadPump::drain`] once per tick, handing every action
//! mutable access to its owning-thread state `S`.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tracing::{error, trace};

/// Deferred unit of work executed on the owning thread.
pub type Action<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Producer half of the dispatch queue.
pub struct Dispatcher<S> {
    queue: Arc<Mutex<Vec<Action<S>>>>,
    enqueued: Arc<AtomicU64>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            enqueued: Arc::clone(&self.enqueued),
        }
    }
}

impl<S> fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queued", &self.len())
            .field("enqueued_total", &self.enqueued.load(Ordering::Relaxed))
            .finish()
    }
}

impl<S: 'static> Dispatcher<S> {
    /// Create the queue. The returned pump is bound to the calling thread.
    pub fn new() -> (Self, MainThreadPump<S>) {
        let dispatcher = Self {
            queue: Arc::new(Mutex::new(Vec::new())),
            enqueued: Arc::new(AtomicU64::new(0)),
        };
        let pump = MainThreadPump {
            queue: Arc::clone(&dispatcher.queue),
            owner: thread::current().id(),
            ticks: 0,
            _not_send: PhantomData,
        };
        (dispatcher, pump)
    }

    /// Append an action to the tail of the queue. Never blocks on the owning
    /// thread and may be called from it.
    pub fn enqueue<F>(&self, action: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.queue.lock().push(Box::new(action));
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }
}

impl<S> Dispatcher<S> {
    /// Actions waiting for the next drain.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

/// Outcome of a single drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub executed: usize,
    pub failed: usize,
}

/// Consumer half of the dispatch queue, pinned to its owning thread.
pub struct MainThreadPump<S> {
    queue: Arc<Mutex<Vec<Action<S>>>>,
    owner: ThreadId,
    ticks: u64,
    _not_send: PhantomData<Rc<()>>,
}

impl<S> fmt::Debug for MainThreadPump<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainThreadPump")
            .field("owner", &self.owner)
            .field("ticks", &self.ticks)
            .field("queued", &self.queue.lock().len())
            .finish()
    }
}

impl<S> MainThreadPump<S> {
    /// Run everything queued so far, in FIFO order.
    ///
    /// The queue is swapped out before the first action runs: actions
    /// enqueued while draining (including by the actions themselves) wait for
    /// the next tick. A panicking action is logged and skipped.
    pub fn drain(&mut self, state: &mut S) -> DrainReport {
        self.ticks += 1;
        let batch = std::mem::take(&mut *self.queue.lock());
        let mut report = DrainReport::default();

        for action in batch {
            match catch_unwind(AssertUnwindSafe(|| action(state))) {
                Ok(()) => report.executed += 1,
                Err(payload) => {
                    report.failed += 1;
                    error!(
                        tick = self.ticks,
                        panic = %panic_message(payload.as_ref()),
                        "main thread dispatch action panicked"
                    );
                }
            }
        }

        if report.executed + report.failed > 0 {
            trace!(
                tick = self.ticks,
                executed = report.executed,
                failed = report.failed,
                "dispatch drain"
            );
        }
        report
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Number of drain passes so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
