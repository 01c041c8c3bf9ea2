//! Fixed-size thread pool fed through an unbounded channel.

use std::{
    any::Any,
    num::NonZeroUsize,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A bounded set of worker threads consuming boxed jobs in FIFO order.
///
/// Cancellation is soft: jobs already running finish, jobs still queued are
/// skipped.
#[derive(Debug)]
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    cancelled: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `requested` workers, clamped to `1..=available_parallelism`.
    #[must_use]
    pub fn new(requested: usize) -> Self {
        let hardware = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let size = requested.clamp(1, hardware);

        let (sender, receiver) = channel::unbounded::<Job>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let workers = (0..size)
            .filter_map(|id| {
                let receiver = receiver.clone();
                let cancelled = Arc::clone(&cancelled);
                thread::Builder::new()
                    .name(format!("conquest-worker-{id}"))
                    .spawn(move || work(id, &receiver, &cancelled))
                    .inspect_err(|e| error!("failed to spawn worker {id}: {e}"))
                    .ok()
            })
            .collect::<Vec<_>>();
        debug!("worker pool started with {} threads", workers.len());

        Self {
            sender: Some(sender),
            cancelled,
            workers,
        }
    }

    /// Number of live worker threads.
    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Queues a job. After [`cancel_all`](Self::cancel_all) the job is
    /// dropped with a warning.
    pub fn insert<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(sender) = self.sender.as_ref().filter(|_| !self.is_cancelled()) else {
            warn!("worker pool is cancelled, dropping job");
            return;
        };
        if sender.send(Box::new(job)).is_err() {
            warn!("all workers are gone, dropping job");
        }
    }

    /// Stops handing out queued jobs and wakes idle workers so they exit.
    pub fn cancel_all(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.sender = None;
    }

    /// Closes the queue and waits for every worker to exit.
    ///
    /// Without a prior [`cancel_all`](Self::cancel_all) the queued jobs are
    /// run to completion first.
    pub fn join(&mut self) {
        self.sender = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cancel_all();
        self.join();
    }
}

fn work(id: usize, receiver: &Receiver<Job>, cancelled: &AtomicBool) {
    while let Ok(job) = receiver.recv() {
        if cancelled.load(Ordering::Acquire) {
            continue;
        }
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            error!("worker {id}: job panicked: {}", panic_message(&*payload));
        }
    }
    debug!("worker {id} exiting");
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_every_queued_job_runs_before_join_returns() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(4);
        assert!((1..=4).contains(&pool.size()));

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.insert(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.join();

        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_requested_size_is_clamped() {
        assert_eq!(WorkerPool::new(0).size(), 1);
        let hardware = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        assert_eq!(WorkerPool::new(usize::MAX).size(), hardware);
    }

    #[test]
    fn test_cancel_skips_queued_jobs() {
        let (started_tx, started_rx) = channel::bounded(1);
        let (gate_tx, gate_rx) = channel::bounded::<()>(1);
        let first_finished = Arc::new(AtomicBool::new(false));
        let skipped = Arc::new(AtomicUsize::new(0));

        let mut pool = WorkerPool::new(1);
        {
            let first_finished = Arc::clone(&first_finished);
            pool.insert(move || {
                started_tx.send(()).unwrap();
                gate_rx.recv().unwrap();
                first_finished.store(true, Ordering::SeqCst);
            });
        }
        started_rx.recv().unwrap();

        for _ in 0..10 {
            let skipped = Arc::clone(&skipped);
            pool.insert(move || {
                skipped.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.cancel_all();
        assert!(pool.is_cancelled());
        gate_tx.send(()).unwrap();
        pool.join();

        assert!(first_finished.load(Ordering::SeqCst));
        assert_eq!(skipped.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_insert_after_cancel_is_dropped() {
        let ran = Arc::new(AtomicBool::new(false));
        let mut pool = WorkerPool::new(2);
        pool.cancel_all();
        {
            let ran = Arc::clone(&ran);
            pool.insert(move || ran.store(true, Ordering::SeqCst));
        }
        pool.join();
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(1);
        pool.insert(|| panic!("boom"));
        {
            let counter = Arc::clone(&counter);
            pool.insert(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.join();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
