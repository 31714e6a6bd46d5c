//! Single-flight delayed execution on one worker thread
//!
//! Leader chords are resolved after a short quiet period. Every new key
//! reschedules, so at most one job is ever waiting. A replaced job is
//! dropped without running; whatever it owned (the result sender of a
//! [`ResolutionHandle`](super::ResolutionHandle)) is dropped with it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum SchedulerMsg {
    Schedule {
        generation: u64,
        delay: Duration,
        job: Job,
    },
    Cancel,
    Shutdown,
}

struct Scheduled {
    deadline: Instant,
    generation: u64,
    job: Job,
}

/// Identity of one scheduled job.
///
/// The worker only checks for a newer schedule or cancel before starting a
/// job; a running job uses its ticket to notice one that arrived later.
#[derive(Clone, Debug)]
pub struct Ticket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// False once a later schedule or cancel has happened
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

pub struct Debouncer {
    tx: Sender<SchedulerMsg>,
    generation: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let generation = Arc::new(AtomicU64::new(0));
        let worker_generation = Arc::clone(&generation);
        let worker = thread::spawn(move || run(rx, worker_generation));

        Self {
            tx,
            generation,
            worker: Some(worker),
        }
    }

    /// Run `job` after `delay`, replacing any job still waiting.
    ///
    /// Returns the generation of the new job.
    pub fn schedule(&self, delay: Duration, job: Job) -> u64 {
        self.schedule_with(delay, |_| job)
    }

    /// Like [`schedule`](Self::schedule), but the job is built with a
    /// [`Ticket`] it can check once it is running.
    pub fn schedule_with<F>(&self, delay: Duration, make_job: F) -> u64
    where
        F: FnOnce(Ticket) -> Job,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let job = make_job(Ticket {
            generation,
            current: Arc::clone(&self.generation),
        });
        if self
            .tx
            .send(SchedulerMsg::Schedule {
                generation,
                delay,
                job,
            })
            .is_err()
        {
            tracing::warn!("debounce worker is gone, dropping scheduled job");
        }
        generation
    }

    /// Drop the waiting job, if any
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.send(SchedulerMsg::Cancel);
    }

    /// Generation of the most recent schedule or cancel
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        let _ = self.tx.send(SchedulerMsg::Shutdown);
        if let Some(worker) = self.worker.take() {
            // A job may own the last reference to whatever owns us
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

fn run(rx: Receiver<SchedulerMsg>, generation: Arc<AtomicU64>) {
    let mut waiting: Option<Scheduled> = None;

    loop {
        let msg = match waiting.as_ref().map(|scheduled| scheduled.deadline) {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    fire(waiting.take(), &generation);
                    continue;
                }
                match rx.recv_timeout(deadline - now) {
                    Ok(msg) => msg,
                    Err(RecvTimeoutError::Timeout) => {
                        fire(waiting.take(), &generation);
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(msg) => msg,
                Err(_) => break,
            },
        };

        match msg {
            SchedulerMsg::Schedule {
                generation: job_generation,
                delay,
                job,
            } => {
                if waiting.is_some() {
                    tracing::trace!(job_generation, "superseding waiting job");
                }
                waiting = Some(Scheduled {
                    deadline: Instant::now() + delay,
                    generation: job_generation,
                    job,
                });
            }
            SchedulerMsg::Cancel => {
                waiting = None;
            }
            SchedulerMsg::Shutdown => break,
        }
    }

    tracing::debug!("debounce worker stopped");
}

fn fire(scheduled: Option<Scheduled>, generation: &AtomicU64) {
    let Some(scheduled) = scheduled else {
        return;
    };
    // Superseded by a schedule or cancel still in the channel
    if scheduled.generation != generation.load(Ordering::SeqCst) {
        return;
    }
    if panic::catch_unwind(AssertUnwindSafe(scheduled.job)).is_err() {
        tracing::warn!("debounced job panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_job_runs_after_delay() {
        let debouncer = Debouncer::new();
        let (tx, rx) = mpsc::channel();
        let start = Instant::now();
        debouncer.schedule(
            Duration::from_millis(30),
            Box::new(move || {
                let _ = tx.send(Instant::now());
            }),
        );
        let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(fired.duration_since(start) >= Duration::from_millis(30));
    }

    #[test]
    fn test_reschedule_supersedes() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        for i in 0..3 {
            let runs = Arc::clone(&runs);
            let tx = tx.clone();
            debouncer.schedule(
                Duration::from_millis(40),
                Box::new(move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    let _ = tx.send(i);
                }),
            );
        }

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 2);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_drops_job() {
        let debouncer = Debouncer::new();
        let (tx, rx) = mpsc::channel::<()>();
        debouncer.schedule(
            Duration::from_millis(20),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        debouncer.cancel();
        // Dropped without running: the sender goes away with the job
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_ticket_goes_stale_while_job_runs() {
        let debouncer = Debouncer::new();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();
        debouncer.schedule_with(Duration::ZERO, move |ticket| -> Job {
            Box::new(move || {
                let _ = started_tx.send(ticket.is_current());
                let _ = release_rx.recv_timeout(Duration::from_secs(2));
                let _ = done_tx.send(ticket.is_current());
            })
        });

        assert!(started_rx.recv_timeout(Duration::from_secs(2)).unwrap());
        debouncer.cancel();
        release_tx.send(()).unwrap();
        assert!(!done_rx.recv_timeout(Duration::from_secs(2)).unwrap());
    }

    #[test]
    fn test_panicking_job_keeps_worker_alive() {
        let debouncer = Debouncer::new();
        debouncer.schedule(Duration::ZERO, Box::new(|| panic!("job bug")));
        let (tx, rx) = mpsc::channel();
        debouncer.schedule(
            Duration::from_millis(50),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }
}
