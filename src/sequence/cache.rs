use std::{
    panic::AssertUnwindSafe,
    sync::{Arc, mpsc},
};

use crate::{
    assets::{decode::FrameImage, loader::FrameLoader},
    foundation::error::{ReelError, ReelResult},
    sequence::descriptor::SequenceDescriptor,
};

/// Default half-width of the prefetch window around the current frame.
pub const DEFAULT_BUFFER_RADIUS: usize = 15;

#[derive(Clone, Debug, Default)]
enum Slot {
    #[default]
    Empty,
    InFlight,
    Ready(Arc<FrameImage>),
}

/// Outcome of [`FrameCache::ensure_frame`].
#[derive(Clone, Debug)]
pub enum FrameStatus {
    /// Frame is decoded and cached.
    Ready(Arc<FrameImage>),
    /// A fetch for this frame is already outstanding; nothing new was issued.
    InFlight,
    /// A new fetch was issued.
    Issued,
}

/// A fetch that completed without producing a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadFailure {
    /// Frame index within the sequence.
    pub index: usize,
    /// Asset path that was requested.
    pub source: String,
    /// Rendered error chain.
    pub reason: String,
}

/// Counters describing cache activity since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fetches handed to the loader.
    pub fetches_issued: u64,
    /// Requests answered by an outstanding fetch instead of a new one.
    pub dedup_hits: u64,
    /// Fetches that produced a frame.
    pub loaded: u64,
    /// Fetches that failed.
    pub failed: u64,
    /// Frames currently held.
    pub resident: usize,
    /// Fetches not yet applied to the cache.
    pub in_flight: usize,
}

struct Completion {
    index: usize,
    source: String,
    result: ReelResult<FrameImage>,
}

/// Lazily populated, never-evicting cache of decoded sequence frames.
///
/// Fetches run on a worker pool. Their results are applied only when the owning thread drains
/// the completion channel ([`FrameCache::pump`] or [`FrameCache::wait_for`]), so every slot is
/// mutated from a single thread and one in-flight marker per slot is enough to guarantee at most
/// one outstanding fetch per index.
pub struct FrameCache {
    descriptor: SequenceDescriptor,
    loader: Arc<dyn FrameLoader>,
    pool: rayon::ThreadPool,
    slots: Vec<Slot>,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
    failures: Vec<LoadFailure>,
    stats: CacheStats,
}

impl std::fmt::Debug for FrameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCache")
            .field("sequence_name", &self.descriptor.sequence_name)
            .field("total_frames", &self.slots.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl FrameCache {
    /// Create an empty cache for `descriptor`, loading through `loader` on a pool of
    /// `worker_threads` threads (`None` uses rayon's default).
    pub fn new(
        descriptor: &SequenceDescriptor,
        loader: Arc<dyn FrameLoader>,
        worker_threads: Option<usize>,
    ) -> ReelResult<Self> {
        descriptor.validate()?;
        let pool = build_thread_pool(worker_threads)?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            descriptor: descriptor.clone(),
            loader,
            pool,
            slots: vec![Slot::Empty; descriptor.total_frames()],
            tx,
            rx,
            failures: Vec::new(),
            stats: CacheStats::default(),
        })
    }

    /// Number of slots (`total_frames`).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false: a valid descriptor has at least one frame.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Cached frame at `index`, if decoded.
    pub fn get(&self, index: usize) -> Option<Arc<FrameImage>> {
        match self.slots.get(index) {
            Some(Slot::Ready(img)) => Some(Arc::clone(img)),
            _ => None,
        }
    }

    /// Whether a fetch for `index` is outstanding.
    pub fn is_in_flight(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Slot::InFlight))
    }

    /// Snapshot of activity counters.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Make sure frame `index` is cached or being fetched.
    ///
    /// Rejects out-of-range indices. A load failure is never returned here; it surfaces later
    /// through [`FrameCache::take_failures`] and leaves the slot empty.
    pub fn ensure_frame(&mut self, index: usize) -> ReelResult<FrameStatus> {
        let total = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            ReelError::validation(format!("frame index {index} out of range 0..{total}"))
        })?;

        match &*slot {
            Slot::Ready(img) => return Ok(FrameStatus::Ready(Arc::clone(img))),
            Slot::InFlight => {
                self.stats.dedup_hits += 1;
                return Ok(FrameStatus::InFlight);
            }
            Slot::Empty => {}
        }
        *slot = Slot::InFlight;

        let source = self.descriptor.frame_source(index);
        tracing::debug!(index, %source, "issue frame fetch");
        self.stats.fetches_issued += 1;
        self.stats.in_flight += 1;

        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        self.pool.spawn(move || {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| loader.load(&source)))
                .unwrap_or_else(|_| Err(ReelError::load("frame loader panicked")));
            // The receiver only disappears with the cache itself.
            let _ = tx.send(Completion {
                index,
                source,
                result,
            });
        });
        Ok(FrameStatus::Issued)
    }

    /// Issue fetches for every uncached, idle index within `radius` of `center`.
    ///
    /// `center` past the end is treated as the last frame. Returns the indices issued, ascending.
    pub fn prefetch(&mut self, center: usize, radius: usize) -> Vec<usize> {
        let Some(last) = self.slots.len().checked_sub(1) else {
            return Vec::new();
        };
        let center = center.min(last);
        let lo = center.saturating_sub(radius);
        let hi = center.saturating_add(radius).min(last);

        let mut issued = Vec::new();
        for i in lo..=hi {
            if matches!(self.slots[i], Slot::Empty) && self.ensure_frame(i).is_ok() {
                issued.push(i);
            }
        }
        issued
    }

    /// Apply every completion that has arrived so far without blocking. Returns how many were
    /// applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(c) = self.rx.try_recv() {
            self.apply(c);
            applied += 1;
        }
        applied
    }

    /// Block until frame `index` is no longer in flight, then return it if it loaded.
    ///
    /// Does not issue a fetch; pair with [`FrameCache::ensure_frame`].
    pub fn wait_for(&mut self, index: usize) -> Option<Arc<FrameImage>> {
        while self.is_in_flight(index) {
            match self.rx.recv() {
                Ok(c) => self.apply(c),
                Err(_) => break,
            }
        }
        self.get(index)
    }

    /// Block until no fetch is outstanding.
    pub fn wait_idle(&mut self) {
        while self.stats.in_flight > 0 {
            match self.rx.recv() {
                Ok(c) => self.apply(c),
                Err(_) => break,
            }
        }
    }

    /// Drain failures recorded since the previous call.
    pub fn take_failures(&mut self) -> Vec<LoadFailure> {
        std::mem::take(&mut self.failures)
    }

    fn apply(&mut self, c: Completion) {
        self.stats.in_flight = self.stats.in_flight.saturating_sub(1);
        let Some(slot) = self.slots.get_mut(c.index) else {
            return;
        };
        match c.result {
            Ok(img) => {
                *slot = Slot::Ready(Arc::new(img));
                self.stats.loaded += 1;
                self.stats.resident += 1;
            }
            Err(e) => {
                *slot = Slot::Empty;
                self.stats.failed += 1;
                let reason = format!("{e:#}");
                tracing::warn!(index = c.index, source = %c.source, %reason, "frame load failed");
                self.failures.push(LoadFailure {
                    index: c.index,
                    source: c.source,
                    reason,
                });
            }
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ReelError::validation("worker_threads must be >= 1 when set"));
    }

    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("scrollreel-load-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::validation(format!("failed to build frame loader pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/cache.rs"]
mod tests;
