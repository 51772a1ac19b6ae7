use serde::Serialize;

use crate::diagnostics::fps::FpsReading;
use crate::frame::handoff::FrameSlot;

/// Collects pipeline statistics on the producer side.
pub struct PipelineStats {
    frames_ingested: u64,
    fallback_frames: u64,
}

/// Snapshot of pipeline stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub fps: f32,
    pub frames_ingested: u64,
    pub frames_published: u64,
    pub frames_dropped: u64,
    pub drop_rate: f64,
    pub fallback_frames: u64,
}

impl PipelineStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            frames_ingested: 0,
            fallback_frames: 0,
        }
    }

    /// Record a frame entering the producer path.
    pub fn record_ingest(&mut self) {
        self.frames_ingested += 1;
    }

    /// Record a degraded frame replaced by the luma fallback.
    pub fn record_fallback(&mut self) {
        self.fallback_frames += 1;
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        self.frames_ingested = 0;
        self.fallback_frames = 0;
    }

    /// Take a serialisable snapshot, folding in the handoff-slot counters
    /// (drops happen at the slot, not here) and the render-side rate.
    pub fn snapshot(&self, slot: &FrameSlot, fps: &FpsReading) -> StatsSnapshot {
        let published = slot.published();
        let dropped = slot.dropped();
        let drop_rate = if published == 0 {
            0.0
        } else {
            (dropped as f64 / published as f64) * 100.0
        };
        StatsSnapshot {
            fps: fps.current(),
            frames_ingested: self.frames_ingested,
            frames_published: published,
            frames_dropped: dropped,
            drop_rate,
            fallback_frames: self.fallback_frames,
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}
