use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, TryLockError};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error, info};

use crate::{
    dsp::wave::Wave,
    wavetable::{FillStatus, SpectrumFiller, SpectrumPlanner, Wavetable},
    Error, Result, SynthConfig, MIN_TABLE_SIZE,
};

/*
Background Recompute and Publish
================================

Band-limiting a wave takes milliseconds: far too long for an audio
callback. `WaveComputer` does it on its own thread and hands the finished
table to the audio thread without ever making it wait.

Double Buffer
-------------

    slot 0  ┌────────────┐      current ──→ 1
            │ Wavetable  │ ← worker fills the inactive slot
            └────────────┘
    slot 1  ┌────────────┐
            │ Wavetable  │ ← readers look here
            └────────────┘

The worker always fills the slot that is *not* current, then publishes it
with one atomic store. Readers load the index and take a non-blocking read
lock on that slot. A reader can only ever collide with the worker if it
loaded the index just before a publish and is still holding on while the
worker comes back around for the next fill; then the worker waits (it is not
realtime) or the reader retries once and otherwise plays one block of
silence. A half-built table is never visible: the index only moves after
the fill is done.

Requests and Coalescing
-----------------------

`update()` stores the latest wave and its generation number under a mutex
and posts a wake-up into a channel with room for one signal. If a signal is
already waiting, the post is dropped: the worker will read the latest wave
anyway. So a burst of updates costs at most one extra fill.

Every published table is built from the newest wave at the moment its fill
started. A fill already running is not abandoned when a newer wave arrives:
it finishes, is published, and the newer wave is computed right after. Only
`stop()` cancels a fill mid-way.

Completion
----------

After each publish, the listener is called on the worker thread with the
generation that was published. Listeners can be closures, crossbeam senders,
or (with the `rtrb` feature) ring buffer producers.
*/

const NONE: usize = usize::MAX;

/// Called on the worker thread whenever a new wavetable is published.
pub trait ComputeListener: Send + 'static {
    fn finished(&mut self, generation: u64);
}

impl ComputeListener for () {
    fn finished(&mut self, _generation: u64) {}
}

impl ComputeListener for Box<dyn FnMut(u64) + Send> {
    fn finished(&mut self, generation: u64) {
        self(generation)
    }
}

impl ComputeListener for Sender<u64> {
    fn finished(&mut self, generation: u64) {
        // A full or disconnected channel only loses a notification
        let _ = self.try_send(generation);
    }
}

#[cfg(feature = "rtrb")]
impl ComputeListener for rtrb::Producer<u64> {
    fn finished(&mut self, generation: u64) {
        let _ = self.push(generation);
    }
}

struct Shared {
    slots: [RwLock<Wavetable>; 2],
    current: AtomicUsize,
    generation: AtomicU64,
    stop: AtomicBool,
}

impl Shared {
    fn new(size: usize) -> Self {
        Self {
            slots: [RwLock::new(Wavetable::new(size)), RwLock::new(Wavetable::new(size))],
            current: AtomicUsize::new(NONE),
            generation: AtomicU64::new(0),
            stop: AtomicBool::new(false),
        }
    }

    fn inactive(&self) -> usize {
        match self.current.load(Ordering::Acquire) {
            0 => 1,
            _ => 0,
        }
    }
}

/// Realtime-safe handle on the most recently published wavetable.
#[derive(Clone)]
pub struct WavetableReader {
    shared: Arc<Shared>,
}

impl WavetableReader {
    /// The published wavetable, or `None` before the first publish or when
    /// the slot is briefly contended. Never blocks.
    pub fn wavetable(&self) -> Option<RwLockReadGuard<'_, Wavetable>> {
        Self::wavetable_of(&self.shared)
    }

    /// Run `f` on the published wavetable.
    #[inline]
    pub fn read<R>(&self, f: impl FnOnce(&Wavetable) -> R) -> Option<R> {
        self.wavetable().map(|table| f(&table))
    }

    /// Generation of the published wavetable; 0 before the first publish.
    ///
    /// May trail the visible table for an instant while a publish is in
    /// progress, but never leads it: once this returns `n`, the table of
    /// generation `n` (or a newer one) is the one readers see.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }
}

impl fmt::Debug for WavetableReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WavetableReader")
            .field("current", &self.shared.current.load(Ordering::Relaxed))
            .field("generation", &self.generation())
            .finish()
    }
}

#[derive(Default)]
struct Request {
    wave: Option<Arc<Wave>>,
    generation: u64,
}

/// Rebuilds wavetables on a dedicated thread and publishes them to readers.
pub struct WaveComputer {
    shared: Arc<Shared>,
    request: Arc<Mutex<Request>>,
    start: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl WaveComputer {
    pub fn new(config: &SynthConfig, listener: impl ComputeListener) -> Result<Self> {
        Self::with_planner(config, SpectrumPlanner::new(), listener)
    }

    /// Like [`new`](Self::new), sharing FFT plans through `planner`.
    pub fn with_planner(
        config: &SynthConfig,
        planner: SpectrumPlanner,
        listener: impl ComputeListener,
    ) -> Result<Self> {
        let sample_count = config.table_size;
        if sample_count < MIN_TABLE_SIZE {
            return Err(Error::TableTooSmall {
                requested: sample_count,
                minimum: MIN_TABLE_SIZE,
            });
        }

        let shared = Arc::new(Shared::new(sample_count));
        let request = Arc::new(Mutex::new(Request::default()));
        let (start, wake) = bounded(1);
        let filler = SpectrumFiller::new(planner).with_autoscale(config.autoscale);

        let worker = Worker {
            shared: Arc::clone(&shared),
            request: Arc::clone(&request),
            wake,
            filler,
            sample_count,
            listener,
        };
        let handle = thread::Builder::new()
            .name("wave-computer".into())
            .spawn(move || worker.run())
            .map_err(Error::ThreadSpawn)?;

        Ok(Self {
            shared,
            request,
            start: Some(start),
            worker: Some(handle),
        })
    }

    /// Queue `wave` for computation and return its generation number.
    /// Waves queued while the worker is busy are coalesced into one fill
    /// of the latest.
    pub fn update(&self, wave: impl Into<Arc<Wave>>) -> u64 {
        let generation = {
            let mut request = self.request.lock().unwrap_or_else(PoisonError::into_inner);
            request.generation += 1;
            request.wave = Some(wave.into());
            request.generation
        };

        if let Some(start) = &self.start {
            match start.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Disconnected(())) => {
                    debug!("wave computer: update {generation} after worker exit");
                }
            }
        }
        generation
    }

    /// The published wavetable. Never blocks; see [`WavetableReader::wavetable`].
    pub fn wavetable(&self) -> Option<RwLockReadGuard<'_, Wavetable>> {
        WavetableReader::wavetable_of(&self.shared)
    }

    /// A handle for the audio thread.
    pub fn reader(&self) -> WavetableReader {
        WavetableReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Generation of the published wavetable; 0 before the first publish.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Cancel any fill in progress and wait for the worker to exit.
    /// The last published wavetable stays readable.
    pub fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        self.shared.stop.store(true, Ordering::Release);
        // Disconnecting wakes an idle worker
        self.start = None;
        if handle.join().is_err() {
            error!("wave computer: worker panicked");
        }
    }
}

impl WavetableReader {
    fn wavetable_of(shared: &Shared) -> Option<RwLockReadGuard<'_, Wavetable>> {
        for _ in 0..2 {
            let index = shared.current.load(Ordering::Acquire);
            let slot = shared.slots.get(index)?;
            match slot.try_read() {
                Ok(guard) => return Some(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
                // The worker took this slot after a newer publish
                Err(TryLockError::WouldBlock) => continue,
            }
        }
        None
    }
}

impl Drop for WaveComputer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for WaveComputer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveComputer")
            .field("generation", &self.generation())
            .field("running", &self.is_running())
            .finish()
    }
}

struct Worker<L> {
    shared: Arc<Shared>,
    request: Arc<Mutex<Request>>,
    wake: Receiver<()>,
    filler: SpectrumFiller,
    sample_count: usize,
    listener: L,
}

impl<L: ComputeListener> Worker<L> {
    fn run(mut self) {
        info!("wave computer started ({} samples per table)", self.sample_count);

        while self.wake.recv().is_ok() {
            if self.shared.stop.load(Ordering::Acquire) {
                break;
            }

            let (wave, generation) = {
                let request = self.request.lock().unwrap_or_else(PoisonError::into_inner);
                (request.wave.clone(), request.generation)
            };
            let Some(wave) = wave else {
                continue;
            };

            if !self.compute(&wave, generation) {
                break;
            }
        }

        info!("wave computer exited");
    }

    /// Fill and publish one wavetable. False when stopped mid-fill.
    fn compute(&mut self, wave: &Wave, generation: u64) -> bool {
        let target = self.shared.inactive();
        let stop = &self.shared.stop;

        let status = {
            let mut table = self.shared.slots[target]
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            self.filler.fill_with_cancel(wave, &mut table, self.sample_count, || {
                stop.load(Ordering::Acquire)
            })
        };

        match status {
            Ok(FillStatus::Complete) => {
                // Table before number: a reader that sees `generation`
                // also sees `target` as current
                self.shared.current.store(target, Ordering::Release);
                self.shared.generation.store(generation, Ordering::Release);
                debug!("wave computer: published generation {generation} in slot {target}");
                self.listener.finished(generation);
                true
            }
            Ok(FillStatus::Interrupted) => {
                debug!("wave computer: generation {generation} interrupted");
                false
            }
            Err(err) => {
                error!("wave computer: generation {generation} failed: {err}");
                true
            }
        }
    }
}
