// Most-recent-wins frame handoff.
//
// The producer (camera callback) and the render loop share exactly one
// value: the newest canonical frame. Publishing atomically replaces any
// unconsumed previous frame; the render loop peeks without removing, so it
// re-renders the same frame when no new one has arrived. Frame drops under
// backpressure are the designed behaviour, not an error.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::frame::CanonicalFrame;

/// Lock-free single-slot exchange between one producer and one consumer.
#[derive(Default)]
pub struct FrameSlot {
    slot: ArcSwapOption<CanonicalFrame>,
    /// Set on publish, cleared on peek; a publish that finds it still set
    /// overwrote a frame nobody consumed.
    fresh: AtomicBool,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the newest frame, returning the replaced occupant (if any) so
    /// its allocation can be recycled. Never blocks.
    pub fn publish(&self, frame: Arc<CanonicalFrame>) -> Option<Arc<CanonicalFrame>> {
        let prev = self.slot.swap(Some(frame));
        self.published.fetch_add(1, Ordering::Relaxed);
        if self.fresh.swap(true, Ordering::AcqRel) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        prev
    }

    /// The most recently published frame, without removing it.
    pub fn peek_latest(&self) -> Option<Arc<CanonicalFrame>> {
        self.fresh.store(false, Ordering::Release);
        self.slot.load_full()
    }

    /// Total frames published since creation.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Frames overwritten before anyone consumed them.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
