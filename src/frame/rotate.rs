// Orientation pre-rotation.
//
// 90/270 capture rotations are resolved here by permuting the grayscale
// buffer into landscape layout before GPU upload. 180 is deliberately NOT
// resolved here: it is a pure point reflection, handled by the render-time
// texture transform so the buffer is not rewritten a second time.

use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::frame::CanonicalFrame;

/// Rotates grayscale frames into canonical landscape layout.
///
/// Keeps a spare buffer so the per-frame destination allocation is
/// amortized; retired frames can be handed back via [`PreRotator::recycle`].
#[derive(Default)]
pub struct PreRotator {
    spare: Vec<u8>,
}

impl PreRotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalise `degrees` into `[0, 360)`, rejecting non-multiples of 90.
    pub fn normalize_rotation(degrees: i32) -> Result<u32> {
        let norm = degrees.rem_euclid(360);
        if norm % 90 != 0 {
            return Err(PipelineError::BadRotation(degrees));
        }
        Ok(norm as u32)
    }

    /// Produce a canonical frame from `gray` (`src_w` x `src_h`, row-major).
    ///
    /// 0/180: straight copy, upload dims unchanged. 90/270: full pixel
    /// permutation with swapped upload dims. Input shorter than
    /// `src_w * src_h` is truncate-copied and zero-filled.
    pub fn rotate(
        &mut self,
        gray: &[u8],
        src_w: usize,
        src_h: usize,
        degrees: i32,
    ) -> Result<CanonicalFrame> {
        if src_w == 0 || src_h == 0 {
            return Err(PipelineError::BadDimensions {
                width: src_w,
                height: src_h,
            });
        }
        let rotation = Self::normalize_rotation(degrees)?;

        let len = src_w * src_h;
        let mut buf = std::mem::take(&mut self.spare);
        if buf.len() < len {
            buf.resize(len, 0);
        }
        buf.truncate(len);

        let avail = gray.len().min(len);
        if avail < len {
            warn!(
                got = gray.len(),
                expected = len,
                "gray frame shorter than its dimensions imply, zero-filling"
            );
        }

        let (upload_w, upload_h) = match rotation {
            90 | 270 => (src_h, src_w),
            _ => (src_w, src_h),
        };

        match rotation {
            90 => {
                buf.fill(0);
                for y in 0..src_h {
                    for x in 0..src_w {
                        let src_idx = y * src_w + x;
                        if src_idx >= avail {
                            continue;
                        }
                        let dst_x = src_h - 1 - y;
                        let dst_y = x;
                        buf[dst_y * upload_w + dst_x] = gray[src_idx];
                    }
                }
            }
            270 => {
                buf.fill(0);
                for y in 0..src_h {
                    for x in 0..src_w {
                        let src_idx = y * src_w + x;
                        if src_idx >= avail {
                            continue;
                        }
                        let dst_x = y;
                        let dst_y = src_w - 1 - x;
                        buf[dst_y * upload_w + dst_x] = gray[src_idx];
                    }
                }
            }
            _ => {
                buf[..avail].copy_from_slice(&gray[..avail]);
                buf[avail..].fill(0);
            }
        }

        Ok(CanonicalFrame {
            data: buf,
            upload_width: upload_w as u32,
            upload_height: upload_h as u32,
            rotation_degrees: rotation,
        })
    }

    /// Reclaim a retired frame's allocation for the next rotation.
    pub fn recycle(&mut self, frame: CanonicalFrame) {
        if frame.data.capacity() > self.spare.capacity() {
            self.spare = frame.data;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotate(gray: &[u8], w: usize, h: usize, deg: i32) -> CanonicalFrame {
        PreRotator::new().rotate(gray, w, h, deg).unwrap()
    }

    #[test]
    fn zero_rotation_is_a_straight_copy() {
        let src: Vec<u8> = (0..6).collect();
        let out = rotate(&src, 3, 2, 0);
        assert_eq!(out.data, src);
        assert_eq!((out.upload_width, out.upload_height), (3, 2));
        assert_eq!(out.rotation_degrees, 0);
    }

    #[test]
    fn rotation_180_copies_unrotated() {
        // The 180 case is a render-time matrix flip, not a buffer rewrite.
        let src: Vec<u8> = (0..6).collect();
        let out = rotate(&src, 3, 2, 180);
        assert_eq!(out.data, src);
        assert_eq!((out.upload_width, out.upload_height), (3, 2));
        assert_eq!(out.rotation_degrees, 180);
    }

    #[test]
    fn rotation_90_permutes_and_swaps_dims() {
        // 3x2 source:        90 CW ->  2x3:
        //   0 1 2                        3 0
        //   3 4 5                        4 1
        //                                5 2
        let src: Vec<u8> = (0..6).collect();
        let out = rotate(&src, 3, 2, 90);
        assert_eq!((out.upload_width, out.upload_height), (2, 3));
        assert_eq!(out.data, vec![3, 0, 4, 1, 5, 2]);
    }

    #[test]
    fn rotation_270_permutes_and_swaps_dims() {
        // 3x2 source:        270 CW -> 2x3:
        //   0 1 2                        2 5
        //   3 4 5                        1 4
        //                                0 3
        let src: Vec<u8> = (0..6).collect();
        let out = rotate(&src, 3, 2, 270);
        assert_eq!((out.upload_width, out.upload_height), (2, 3));
        assert_eq!(out.data, vec![2, 5, 1, 4, 0, 3]);
    }

    #[test]
    fn rotation_90_then_270_round_trips() {
        let src: Vec<u8> = (0..12).collect();
        let mut r = PreRotator::new();
        let once = r.rotate(&src, 4, 3, 90).unwrap();
        let back = r
            .rotate(&once.data, once.upload_width as usize, once.upload_height as usize, 270)
            .unwrap();
        assert_eq!(back.data, src);
        assert_eq!((back.upload_width, back.upload_height), (4, 3));
    }

    #[test]
    fn negative_degrees_normalise() {
        let src: Vec<u8> = (0..6).collect();
        let out = rotate(&src, 3, 2, -90);
        assert_eq!(out.rotation_degrees, 270);
    }

    #[test]
    fn non_right_angle_rotation_is_rejected() {
        let mut r = PreRotator::new();
        assert!(matches!(
            r.rotate(&[0u8; 4], 2, 2, 45),
            Err(PipelineError::BadRotation(45))
        ));
    }

    #[test]
    fn short_input_zero_fills() {
        let out = rotate(&[5u8, 6], 2, 2, 0);
        assert_eq!(out.data, vec![5, 6, 0, 0]);
    }

    #[test]
    fn recycle_reuses_capacity() {
        let mut r = PreRotator::new();
        let frame = r.rotate(&[0u8; 64], 8, 8, 90).unwrap();
        let ptr = frame.data.as_ptr();
        r.recycle(frame);
        let next = r.rotate(&[0u8; 64], 8, 8, 90).unwrap();
        assert_eq!(next.data.as_ptr(), ptr);
    }
}
