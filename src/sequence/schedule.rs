use crate::foundation::core::Viewport;
use crate::sequence::mapping::ScrollMetrics;

/// Values that can absorb a later signal arriving in the same frame interval.
pub trait Coalesce {
    /// Fold `later` into `self`.
    fn coalesce(&mut self, later: Self);
}

/// Pending-flag debounce: any number of signals between two ticks collapse into one handler run.
///
/// `signal` reports whether the caller must schedule a tick (idle -> pending); `flush` hands the
/// merged value to the tick and returns to idle.
#[derive(Clone, Debug)]
pub struct Coalescer<T> {
    pending: Option<T>,
    coalesced: u64,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            pending: None,
            coalesced: 0,
        }
    }
}

impl<T: Coalesce> Coalescer<T> {
    /// Idle coalescer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal. Returns `true` only when no tick was pending yet.
    pub fn signal(&mut self, value: T) -> bool {
        match self.pending.as_mut() {
            Some(p) => {
                p.coalesce(value);
                self.coalesced += 1;
                false
            }
            None => {
                self.pending = Some(value);
                true
            }
        }
    }

    /// Take the merged pending value, if any.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Whether a tick is pending.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Signals absorbed into an already pending one since construction.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}

/// Host event delivered to the player between ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlayerSignal {
    /// Page scrolled.
    Scroll(ScrollMetrics),
    /// Viewport resized; layout usually changes with it.
    Resize {
        /// New surface size.
        viewport: Viewport,
        /// Layout after the resize.
        metrics: ScrollMetrics,
    },
}

impl PlayerSignal {
    /// Layout carried by the signal.
    pub fn metrics(&self) -> ScrollMetrics {
        match self {
            Self::Scroll(m) => *m,
            Self::Resize { metrics, .. } => *metrics,
        }
    }
}

impl Coalesce for PlayerSignal {
    fn coalesce(&mut self, later: Self) {
        *self = match (*self, later) {
            (Self::Resize { viewport, .. }, Self::Scroll(metrics)) => {
                Self::Resize { viewport, metrics }
            }
            (_, later) => later,
        };
    }
}

impl Coalesce for ScrollMetrics {
    fn coalesce(&mut self, later: Self) {
        *self = later;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/schedule.rs"]
mod tests;
