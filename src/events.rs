//! Engine events and the listener hub
//!
//! The engine never talks to the UI directly. When constructed with an
//! [`EventSender`] it publishes an [`EngineEvent`] for every step worth
//! showing on a status line. [`EventHub`] owns the receiving end and a single
//! consumer thread that fans events out to subscribed listeners.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Mutex, RwLock};

use crate::keymap::Mode;

/// Something the engine did that a UI may want to reflect
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// Keys are buffered waiting for more input
    KeysPending { mode: Mode, keys: String },
    BindingExecuted {
        mode: Mode,
        token: String,
        description: String,
    },
    /// The buffered keys matched nothing and were dropped
    NoMatch { mode: Mode, keys: String },
    /// The cancel key dropped the buffered keys
    Cancelled { mode: Mode, keys: String },
    HandlerFailed {
        mode: Mode,
        token: String,
        message: String,
    },
    /// A macro chain was cut off at the recursion bound
    RecursionLimit {
        mode: Mode,
        token: String,
        depth: usize,
    },
    OverridesReverted { count: usize },
}

pub type EventSender = Sender<EngineEvent>;

pub type ListenerId = u64;

type Listener = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

type Listeners = Arc<RwLock<Vec<(ListenerId, Listener)>>>;

/// Owns the event channel and its consumer thread
pub struct EventHub {
    sender: Mutex<Option<EventSender>>,
    listeners: Listeners,
    next_id: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let listeners: Listeners = Arc::new(RwLock::new(Vec::new()));
        let worker_listeners = Arc::clone(&listeners);
        let worker = std::thread::spawn(move || dispatch_loop(rx, worker_listeners));

        Self {
            sender: Mutex::new(Some(tx)),
            listeners,
            next_id: AtomicU64::new(1),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// A sender to hand to the engine. After [`shutdown`](Self::shutdown)
    /// this returns a sender whose events go nowhere.
    pub fn sender(&self) -> EventSender {
        match self.sender.lock().as_ref() {
            Some(tx) => tx.clone(),
            None => mpsc::channel().0,
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Stop accepting events and wait for the consumer to drain.
    ///
    /// The thread exits once every sender (including clones held by
    /// engines) has been dropped.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventHub {
    fn drop(&mut self) {
        // Don't block on engines that still hold senders
        self.sender.lock().take();
    }
}

fn dispatch_loop(rx: Receiver<EngineEvent>, listeners: Listeners) {
    for event in rx {
        let current: Vec<Listener> = listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in current {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                tracing::warn!(?event, "event listener panicked");
            }
        }
    }
    tracing::debug!("event hub drained");
}

/// Publish to an optional sender, ignoring a hung-up receiver
pub(crate) fn emit(sender: Option<&EventSender>, event: EngineEvent) {
    if let Some(tx) = sender {
        let _ = tx.send(event);
    }
}
