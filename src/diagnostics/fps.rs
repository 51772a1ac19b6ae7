use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Rolling frames-per-second estimator.
///
/// `tick()` is called once per render; every time at least one second of
/// monotonic time has elapsed the rate is recomputed and the window resets.
/// Only the render context may tick; the last computed rate is published
/// through an atomic so any thread can read it via [`FpsReading`].
pub struct FpsCounter {
    frame_count: u64,
    window_start: Option<Instant>,
    rate_bits: Arc<AtomicU32>,
}

/// Cloneable cross-thread handle to the last computed rate.
#[derive(Clone)]
pub struct FpsReading {
    rate_bits: Arc<AtomicU32>,
}

impl FpsReading {
    /// The rate from the last completed window; 0.0 before the first one.
    pub fn current(&self) -> f32 {
        f32::from_bits(self.rate_bits.load(Ordering::Relaxed))
    }
}

const WINDOW_NS: u128 = 1_000_000_000;

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            window_start: None,
            rate_bits: Arc::new(AtomicU32::new(0.0f32.to_bits())),
        }
    }

    /// Handle for reading the rate from other threads.
    pub fn reading(&self) -> FpsReading {
        FpsReading {
            rate_bits: Arc::clone(&self.rate_bits),
        }
    }

    /// Record one rendered frame at the current instant.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Record one rendered frame at `now`. Exposed for deterministic tests;
    /// `now` must come from the same monotonic timeline as earlier ticks.
    pub fn tick_at(&mut self, now: Instant) {
        let start = *self.window_start.get_or_insert(now);
        self.frame_count += 1;

        let elapsed = now.duration_since(start).as_nanos();
        if elapsed >= WINDOW_NS {
            let rate = self.frame_count as f64 * 1e9 / elapsed as f64;
            self.rate_bits
                .store((rate as f32).to_bits(), Ordering::Relaxed);
            self.frame_count = 0;
            self.window_start = Some(now);
        }
    }

    /// The rate from the last completed window; 0.0 before the first one.
    pub fn current(&self) -> f32 {
        f32::from_bits(self.rate_bits.load(Ordering::Relaxed))
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
