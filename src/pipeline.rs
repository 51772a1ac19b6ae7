// Host control surface.
//
// EdgePipeline owns the producer side of the pipeline: normalization,
// processing, pre-rotation, and publication into the handoff slot. The
// render side receives its handles once via `render_handles` and runs
// independently; the slot is the only state the two share.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::diagnostics::fps::{FpsCounter, FpsReading};
use crate::diagnostics::stats::{PipelineStats, StatsSnapshot};
use crate::error::Result;
use crate::frame::handoff::FrameSlot;
use crate::frame::pack::Normalizer;
use crate::frame::rotate::PreRotator;
use crate::frame::{CanonicalFrame, PlanarFrame};
use crate::process::{check_output, luma_fallback, ImageProcessor};
use crate::render::state::RenderSettings;

/// Canonical layout derived from orientation parameters.
///
/// Recomputed only when the parameters actually change, never mid-frame, so
/// a resize cannot tear against an in-flight conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct OrientationLayout {
    width: usize,
    height: usize,
    rotation_degrees: i32,
}

/// Handles handed to the render context exactly once.
pub struct RenderHandles {
    pub slot: Arc<FrameSlot>,
    pub settings: Arc<RenderSettings>,
    pub fps: FpsCounter,
}

/// Producer-side pipeline: raw camera frames in, canonical frames out.
pub struct EdgePipeline {
    normalizer: Normalizer,
    rotator: PreRotator,
    processor: Box<dyn ImageProcessor>,
    layout: OrientationLayout,
    gray_scratch: Vec<u8>,

    slot: Arc<FrameSlot>,
    settings: Arc<RenderSettings>,
    fps: FpsReading,
    render_handles: Option<RenderHandles>,
    stats: Arc<Mutex<PipelineStats>>,

    /// Replace near-empty processor output with the raw luma plane.
    luma_fallback_enabled: bool,
}

impl EdgePipeline {
    pub fn new(processor: Box<dyn ImageProcessor>) -> Self {
        let slot = Arc::new(FrameSlot::new());
        let settings = Arc::new(RenderSettings::new());
        let fps = FpsCounter::new();
        let reading = fps.reading();
        Self {
            normalizer: Normalizer::new(),
            rotator: PreRotator::new(),
            processor,
            layout: OrientationLayout::default(),
            gray_scratch: Vec::new(),
            slot: Arc::clone(&slot),
            settings: Arc::clone(&settings),
            fps: reading,
            render_handles: Some(RenderHandles {
                slot,
                settings,
                fps,
            }),
            stats: Arc::new(Mutex::new(PipelineStats::new())),
            luma_fallback_enabled: true,
        }
    }

    /// One-shot handout of the render-side handles. The FPS counter can
    /// only live on the render context, so this consumes it.
    pub fn render_handles(&mut self) -> Option<RenderHandles> {
        self.render_handles.take()
    }

    /// Recompute the canonical layout. A no-op when nothing changed.
    pub fn set_orientation(&mut self, width: usize, height: usize, rotation_degrees: i32) {
        let next = OrientationLayout {
            width,
            height,
            rotation_degrees,
        };
        if next == self.layout {
            return;
        }
        info!(
            width,
            height, rotation_degrees, "orientation layout recomputed"
        );
        self.layout = next;
    }

    /// Full producer path: normalize, process, guard, pre-rotate, publish.
    ///
    /// `rotation_degrees` is the capture rotation hint delivered with the
    /// frame; it also refreshes the canonical layout.
    pub fn ingest(&mut self, frame: &PlanarFrame<'_>, rotation_degrees: i32) -> Result<()> {
        self.set_orientation(frame.width, frame.height, rotation_degrees);
        self.stats.lock().record_ingest();

        let packed = self.normalizer.normalize(frame)?;

        let mut gray = std::mem::take(&mut self.gray_scratch);
        let result = self.processor.process(packed, &mut gray);
        if let Err(e) = result {
            self.gray_scratch = gray;
            return Err(e);
        }
        if let Err(e) = check_output(packed, &gray) {
            self.gray_scratch = gray;
            return Err(e);
        }
        if self.luma_fallback_enabled && luma_fallback(packed, &mut gray) {
            self.stats.lock().record_fallback();
        }

        let publish = self.rotator.rotate(
            &gray,
            frame.width,
            frame.height,
            self.layout.rotation_degrees,
        );
        self.gray_scratch = gray;
        let canonical = publish?;
        self.publish_canonical(canonical);
        Ok(())
    }

    /// Feed an already-processed gray buffer straight into the handoff.
    pub fn publish_frame(&mut self, gray: &[u8], width: usize, height: usize) -> Result<()> {
        self.stats.lock().record_ingest();
        let canonical = self
            .rotator
            .rotate(gray, width, height, self.layout.rotation_degrees)?;
        self.publish_canonical(canonical);
        Ok(())
    }

    fn publish_canonical(&mut self, frame: CanonicalFrame) {
        if let Some(evicted) = self.slot.publish(Arc::new(frame)) {
            // Unconsumed frames come back here so their buffers get reused.
            if let Ok(inner) = Arc::try_unwrap(evicted) {
                self.rotator.recycle(inner);
            }
        }
    }

    /// The rate from the renderer's last completed one-second window.
    pub fn current_fps(&self) -> f32 {
        self.fps.current()
    }

    /// Mirror the displayed frame vertically (e.g. front-facing cameras).
    /// Applied by the renderer at its next tick.
    pub fn set_vertical_flip(&self, flip: bool) {
        debug!(flip, "vertical flip updated");
        self.settings.set_vertical_flip(flip);
    }

    /// Swap the frame processor (e.g. edge detection vs plain grayscale).
    pub fn set_processor(&mut self, processor: Box<dyn ImageProcessor>) {
        self.processor = processor;
    }

    /// Enable or disable the degraded-output luma fallback.
    pub fn set_luma_fallback(&mut self, enabled: bool) {
        self.luma_fallback_enabled = enabled;
    }

    /// Snapshot of pipeline statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.lock().snapshot(&self.slot, &self.fps)
    }
}
