// Image-processor seam.
//
// The pipeline treats the frame-to-frame transform (edge detection in the
// reference deployment) as an opaque capability: packed frame in, gray
// frame of the same dimensions out, synchronous, side-effect-free.

use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::frame::PackedFrame;

/// A pluggable single-channel image processor.
///
/// Implementations receive the packed frame and must fill `out` with
/// exactly `width * height` bytes.
pub trait ImageProcessor: Send {
    fn process(&mut self, packed: &PackedFrame, out: &mut Vec<u8>) -> Result<()>;
}

/// Extracts the luma plane unchanged — the "gray" viewer mode, and the
/// fallback target when a processor's output is degenerate.
#[derive(Default)]
pub struct LumaExtract;

impl ImageProcessor for LumaExtract {
    fn process(&mut self, packed: &PackedFrame, out: &mut Vec<u8>) -> Result<()> {
        out.clear();
        out.extend_from_slice(packed.luma());
        Ok(())
    }
}

/// Fraction of non-zero output bytes below which the processed frame is
/// considered degenerate and replaced by the raw luma plane.
const MIN_NONZERO_RATIO: f32 = 0.02;

/// Replace a nearly-empty processor output with the luma plane.
///
/// A visibly degraded frame is preferable to a black screen when the
/// processor misbehaves; the swap is logged so the root cause stays
/// observable.
pub fn luma_fallback(packed: &PackedFrame, out: &mut Vec<u8>) -> bool {
    let total = packed.width * packed.height;
    if total == 0 || out.len() < total {
        return false;
    }
    let non_zero = out[..total].iter().filter(|&&b| b != 0).count();
    let ratio = non_zero as f32 / total as f32;
    if ratio < MIN_NONZERO_RATIO {
        warn!(
            non_zero_pct = ratio * 100.0,
            "processed frame almost empty, falling back to luma plane"
        );
        out[..total].copy_from_slice(packed.luma());
        return true;
    }
    false
}

/// Validate a processor's output length against the frame dimensions.
pub fn check_output(packed: &PackedFrame, out: &[u8]) -> Result<()> {
    let expected = packed.width * packed.height;
    if out.len() != expected {
        return Err(PipelineError::ProcessorOutput {
            got: out.len(),
            expected,
        });
    }
    Ok(())
}
