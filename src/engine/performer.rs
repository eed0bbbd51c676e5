use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{error, info};

use crate::{Error, Result};

/// Something expensive to run off the audio thread.
pub trait Work: Send + 'static {
    fn perform(&mut self);
}

impl<F: FnMut() + Send + 'static> Work for F {
    fn perform(&mut self) {
        self()
    }
}

/// Submissions queued so far and how many of them have run.
#[derive(Default)]
struct Progress {
    submitted: u64,
    completed: u64,
}

impl Progress {
    fn pending(&self) -> bool {
        self.completed < self.submitted
    }
}

struct UnitInner<W> {
    work: Mutex<W>,
    ready: AtomicBool,
    progress: Mutex<Progress>,
    signal: Condvar,
}

/// A piece of work plus its completion state, shared between the thread
/// that submits it and the worker that runs it.
///
/// A unit may be submitted again while an earlier run is still going; it
/// only counts as ready once every submission has run. `is_ready()` is a
/// single atomic load and safe to poll from the audio thread; everything
/// else may block.
pub struct Unit<W: Work> {
    inner: Arc<UnitInner<W>>,
}

impl<W: Work> Clone for Unit<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Work> Unit<W> {
    pub fn new(work: W) -> Self {
        Self {
            inner: Arc::new(UnitInner {
                work: Mutex::new(work),
                ready: AtomicBool::new(false),
                progress: Mutex::new(Progress::default()),
                signal: Condvar::new(),
            }),
        }
    }

    /// Whether every submission so far has finished.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Block until every submission so far has finished. Returns at once
    /// when nothing is pending.
    pub fn wait(&self) {
        let mut progress = self.lock_progress();
        while progress.pending() {
            progress = self
                .inner
                .signal
                .wait(progress)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`. True when
    /// nothing is pending.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let progress = self.lock_progress();
        let (progress, _) = self
            .inner
            .signal
            .wait_timeout_while(progress, timeout, |progress| progress.pending())
            .unwrap_or_else(PoisonError::into_inner);
        !progress.pending()
    }

    /// Clear the ready flag, e.g. once its result has been consumed.
    /// Pending submissions are unaffected.
    pub fn reset(&self) {
        let _progress = self.lock_progress();
        self.inner.ready.store(false, Ordering::Release);
    }

    /// Access the work value, e.g. to read its results once ready or to
    /// set up its inputs before submitting. Blocks while it runs.
    pub fn with_work<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        let mut work = self
            .inner
            .work
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut work)
    }

    fn submit(&self) {
        let mut progress = self.lock_progress();
        progress.submitted += 1;
        self.inner.ready.store(false, Ordering::Release);
    }

    /// Undo a submission that never reached a worker.
    fn withdraw(&self) {
        let mut progress = self.lock_progress();
        progress.submitted -= 1;
        if !progress.pending() {
            self.inner.signal.notify_all();
        }
    }

    fn run(&self) {
        // A panicking work still counts as finished and keeps its worker alive
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.with_work(|work| work.perform())
        }));
        if outcome.is_err() {
            error!("work performer: unit panicked");
        }

        let mut progress = self.lock_progress();
        progress.completed += 1;
        if !progress.pending() {
            self.inner.ready.store(true, Ordering::Release);
        }
        self.inner.signal.notify_all();
    }

    fn lock_progress(&self) -> MutexGuard<'_, Progress> {
        self.inner
            .progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Work> fmt::Debug for Unit<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

type Job = Box<dyn FnOnce() + Send>;

/// Fixed-size pool of threads sleeping on a shared queue.
pub struct WorkPerformer {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkPerformer {
    /// Start `threads` workers (at least one). Fails if a thread cannot be
    /// spawned; workers already started are shut down again.
    pub fn new(threads: usize) -> Result<Self> {
        let (sender, receiver) = unbounded::<Job>();
        let mut performer = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(threads.max(1)),
        };

        for index in 0..threads.max(1) {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("work-performer-{index}"))
                .spawn(move || work_loop(receiver))
                .map_err(Error::ThreadSpawn)?;
            performer.workers.push(handle);
        }

        info!("work performer started with {} threads", performer.workers.len());
        Ok(performer)
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Queue `unit` to run on the next idle worker. It stops being ready
    /// until this run, and any earlier pending ones, have finished.
    pub fn perform<W: Work>(&self, unit: &Unit<W>) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(Error::Stopped)?;
        unit.submit();
        let job = unit.clone();
        sender.send(Box::new(move || job.run())).map_err(|_| {
            unit.withdraw();
            Error::Stopped
        })
    }

    /// Let queued work finish, then join every worker.
    pub fn stop(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("work performer: worker panicked");
            }
        }
        info!("work performer stopped");
    }
}

impl Drop for WorkPerformer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for WorkPerformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkPerformer")
            .field("threads", &self.workers.len())
            .field("running", &self.sender.is_some())
            .finish()
    }
}

fn work_loop(receiver: Receiver<Job>) {
    // Disconnects once the performer drops its sender and the queue drains
    while let Ok(job) = receiver.recv() {
        job();
    }
}
