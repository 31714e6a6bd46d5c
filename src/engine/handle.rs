//! Handle to the outcome of one key

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use crate::error::ResolveError;
use crate::keymap::Resolution;

pub type ResolveResult = Result<Resolution, ResolveError>;

/// Outcome of [`ChordEngine::resolve`](super::ChordEngine::resolve).
///
/// Immediate resolutions are ready on return. Deferred ones complete when the
/// debounce timer fires, or report [`Resolution::Superseded`] when a later
/// key replaced them. The result can be taken once.
#[derive(Debug)]
pub struct ResolutionHandle {
    rx: Receiver<ResolveResult>,
    deferred: bool,
    taken: bool,
}

impl ResolutionHandle {
    pub(crate) fn ready(result: ResolveResult) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(result);
        Self {
            rx,
            deferred: false,
            taken: false,
        }
    }

    pub(crate) fn deferred() -> (Sender<ResolveResult>, Self) {
        let (tx, rx) = mpsc::channel();
        (
            tx,
            Self {
                rx,
                deferred: true,
                taken: false,
            },
        )
    }

    /// Whether resolution was handed to the debounce worker
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Block until the outcome is known
    pub fn wait(mut self) -> ResolveResult {
        if self.taken {
            return Ok(Resolution::Superseded);
        }
        self.taken = true;
        self.rx.recv().unwrap_or(Ok(Resolution::Superseded))
    }

    /// Block for at most `timeout`. None if still pending or already taken.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<ResolveResult> {
        if self.taken {
            return None;
        }
        let result = match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Ok(Resolution::Superseded),
        };
        self.taken = true;
        Some(result)
    }

    /// Non-blocking poll. None if still pending or already taken.
    pub fn try_result(&mut self) -> Option<ResolveResult> {
        if self.taken {
            return None;
        }
        let result = match self.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Ok(Resolution::Superseded),
        };
        self.taken = true;
        Some(result)
    }
}
