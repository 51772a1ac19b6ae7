// Semi-planar to packed conversion.
//
// Camera frames arrive either as one contiguous buffer already in packed
// layout or as three independent Y/U/V planes with per-plane strides. Both
// are normalised into the packed layout the image processor expects:
// a full Y plane followed by interleaved VU chroma.

use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::frame::{PackedFrame, PlanarFrame, PlanarSource};

/// Converts raw planar frames into packed frames.
///
/// Holds a reusable scratch buffer so steady-state conversion does not
/// allocate; no other state survives between calls.
#[derive(Default)]
pub struct Normalizer {
    scratch: PackedFrame,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalise `frame` into the packed layout.
    ///
    /// The returned reference stays valid until the next call. A source
    /// shorter than its dimensions imply is truncate-copied and zero-filled
    /// rather than rejected, to keep the real-time pipeline alive.
    pub fn normalize(&mut self, frame: &PlanarFrame<'_>) -> Result<&PackedFrame> {
        let (width, height) = (frame.width, frame.height);
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(PipelineError::BadDimensions { width, height });
        }

        let packed_len = PackedFrame::packed_len(width, height);
        self.scratch.data.resize(packed_len, 0);
        self.scratch.width = width;
        self.scratch.height = height;
        let out = &mut self.scratch.data;

        match frame.source {
            PlanarSource::Contiguous(src) => {
                let copy = src.len().min(packed_len);
                out[..copy].copy_from_slice(&src[..copy]);
                if copy < packed_len {
                    warn!(
                        got = src.len(),
                        expected = packed_len,
                        "contiguous source shorter than packed size, zero-filling"
                    );
                    out[copy..].fill(0);
                }
            }
            PlanarSource::Planar { y, u, v } => {
                // Y plane row by row; destination rows are tightly packed.
                for row in 0..height {
                    let src_start = row * y.row_stride;
                    let dst = &mut out[row * width..(row + 1) * width];
                    let src = y.data.get(src_start..).unwrap_or(&[]);
                    let avail = src.len().min(width);
                    dst[..avail].copy_from_slice(&src[..avail]);
                    dst[avail..].fill(0);
                }

                // Interleave chroma, V before U per 2x2 block.
                let chroma_height = height / 2;
                let chroma_width = width / 2;
                let mut pos = width * height;
                for row in 0..chroma_height {
                    for col in 0..chroma_width {
                        out[pos] = v.sample(row, col);
                        out[pos + 1] = u.sample(row, col);
                        pos += 2;
                    }
                }
            }
        }

        Ok(&self.scratch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PlaneView;

    fn planar<'a>(
        y: PlaneView<'a>,
        u: PlaneView<'a>,
        v: PlaneView<'a>,
        width: usize,
        height: usize,
    ) -> PlanarFrame<'a> {
        PlanarFrame {
            source: PlanarSource::Planar { y, u, v },
            width,
            height,
        }
    }

    #[test]
    fn contiguous_source_copies_through() {
        let src: Vec<u8> = (0..24).collect();
        let frame = PlanarFrame {
            source: PlanarSource::Contiguous(&src),
            width: 4,
            height: 4,
        };
        let mut n = Normalizer::new();
        let packed = n.normalize(&frame).unwrap();
        assert_eq!(packed.data, src);
    }

    #[test]
    fn short_contiguous_source_zero_fills_remainder() {
        let src = [7u8; 10];
        let frame = PlanarFrame {
            source: PlanarSource::Contiguous(&src),
            width: 4,
            height: 4,
        };
        let mut n = Normalizer::new();
        let packed = n.normalize(&frame).unwrap();
        assert_eq!(packed.data.len(), 24);
        assert_eq!(&packed.data[..10], &src);
        assert!(packed.data[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn planar_source_packs_y_then_vu() {
        // 2x2 frame: Y = [1,2,3,4], one chroma sample U=50, V=60.
        let y = [1u8, 2, 3, 4];
        let u = [50u8];
        let v = [60u8];
        let frame = planar(
            PlaneView::tight(&y, 2),
            PlaneView::tight(&u, 1),
            PlaneView::tight(&v, 1),
            2,
            2,
        );
        let mut n = Normalizer::new();
        let packed = n.normalize(&frame).unwrap();
        // V before U is the fixed contract of the packed layout.
        assert_eq!(packed.data, vec![1, 2, 3, 4, 60, 50]);
    }

    #[test]
    fn conversion_is_stride_independent() {
        // Same logical 4x2 image, once tightly packed and once with row
        // padding and a chroma pixel stride of 2.
        let y_tight: Vec<u8> = (10..18).collect();
        let u_tight = [100u8, 101];
        let v_tight = [200u8, 201];

        let mut y_padded = Vec::new();
        for row in y_tight.chunks(4) {
            y_padded.extend_from_slice(row);
            y_padded.extend_from_slice(&[0xEE; 4]); // row padding
        }
        let u_padded = [100u8, 0xEE, 101, 0xEE];
        let v_padded = [200u8, 0xEE, 201, 0xEE];

        let tight = planar(
            PlaneView::tight(&y_tight, 4),
            PlaneView::tight(&u_tight, 2),
            PlaneView::tight(&v_tight, 2),
            4,
            2,
        );
        let padded = planar(
            PlaneView {
                data: &y_padded,
                row_stride: 8,
                pixel_stride: 1,
            },
            PlaneView {
                data: &u_padded,
                row_stride: 4,
                pixel_stride: 2,
            },
            PlaneView {
                data: &v_padded,
                row_stride: 4,
                pixel_stride: 2,
            },
            4,
            2,
        );

        let mut n = Normalizer::new();
        let a = n.normalize(&tight).unwrap().data.clone();
        let b = n.normalize(&padded).unwrap().data.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn packed_length_invariant_holds() {
        for (w, h) in [(2usize, 2usize), (4, 4), (8, 6), (640, 480)] {
            let src = vec![0u8; PackedFrame::packed_len(w, h)];
            let frame = PlanarFrame {
                source: PlanarSource::Contiguous(&src),
                width: w,
                height: h,
            };
            let mut n = Normalizer::new();
            let packed = n.normalize(&frame).unwrap();
            assert_eq!(packed.data.len(), w * h + w * h / 2);
        }
    }

    #[test]
    fn odd_dimensions_are_rejected() {
        let src = [0u8; 6];
        let frame = PlanarFrame {
            source: PlanarSource::Contiguous(&src),
            width: 3,
            height: 2,
        };
        let mut n = Normalizer::new();
        assert!(matches!(
            n.normalize(&frame),
            Err(PipelineError::BadDimensions { .. })
        ));
    }

    #[test]
    fn short_planes_yield_zero_samples() {
        let y = [9u8; 2]; // half the Y plane missing
        let u: [u8; 0] = [];
        let v: [u8; 0] = [];
        let frame = planar(
            PlaneView::tight(&y, 2),
            PlaneView::tight(&u, 1),
            PlaneView::tight(&v, 1),
            2,
            2,
        );
        let mut n = Normalizer::new();
        let packed = n.normalize(&frame).unwrap();
        assert_eq!(packed.data, vec![9, 9, 0, 0, 0, 0]);
    }

    #[test]
    fn y_plane_shorter_than_one_row_zero_fills() {
        // Rows past the end of the plane must come out as zeros, not panic.
        let y = [9u8]; // one byte of a 2x2 Y plane
        let u: [u8; 0] = [];
        let v: [u8; 0] = [];
        let frame = planar(
            PlaneView::tight(&y, 2),
            PlaneView::tight(&u, 1),
            PlaneView::tight(&v, 1),
            2,
            2,
        );
        let mut n = Normalizer::new();
        let packed = n.normalize(&frame).unwrap();
        assert_eq!(packed.data, vec![9, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn y_plane_ending_mid_frame_keeps_later_rows_zero() {
        // 4x4 with only the first row and a half present: second row is
        // partial, third and fourth start past the end of the plane.
        let y = [7u8; 6];
        let u = [128u8; 4];
        let v = [128u8; 4];
        let frame = planar(
            PlaneView::tight(&y, 4),
            PlaneView::tight(&u, 2),
            PlaneView::tight(&v, 2),
            4,
            4,
        );
        let mut n = Normalizer::new();
        let packed = n.normalize(&frame).unwrap();
        assert_eq!(&packed.data[..4], &[7, 7, 7, 7]);
        assert_eq!(&packed.data[4..8], &[7, 7, 0, 0]);
        assert!(packed.data[8..16].iter().all(|&b| b == 0));
    }
}
