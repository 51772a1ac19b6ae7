// Frame domain — pixel formats, normalization, rotation, and handoff.

pub mod handoff;
pub mod pack;
pub mod rotate;

/// One plane of a semi-planar camera frame.
///
/// `row_stride` is the byte distance between consecutive rows and
/// `pixel_stride` the byte distance between consecutive samples within a
/// row. Both may be larger than the tightly-packed size due to padding.
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    pub data: &'a [u8],
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl<'a> PlaneView<'a> {
    /// Plane over tightly-packed data (row stride = width, pixel stride = 1).
    pub fn tight(data: &'a [u8], width: usize) -> Self {
        Self {
            data,
            row_stride: width,
            pixel_stride: 1,
        }
    }

    /// Sample at `(row, col)`, or zero when the plane is shorter than its
    /// strides imply. A short plane is a producer bug; reading past the
    /// buffer is not an option either way.
    #[inline]
    pub fn sample(&self, row: usize, col: usize) -> u8 {
        let idx = row * self.row_stride + col * self.pixel_stride;
        self.data.get(idx).copied().unwrap_or(0)
    }
}

/// Pixel layout of a raw camera frame.
#[derive(Debug, Clone, Copy)]
pub enum PlanarSource<'a> {
    /// Single contiguous plane already in packed layout.
    Contiguous(&'a [u8]),
    /// Three independent planes, each with its own strides.
    Planar {
        y: PlaneView<'a>,
        u: PlaneView<'a>,
        v: PlaneView<'a>,
    },
}

/// Borrowed descriptor of one captured frame.
///
/// Owned by the camera subsystem; the normalizer only reads it and never
/// retains it beyond a single conversion call.
#[derive(Debug, Clone, Copy)]
pub struct PlanarFrame<'a> {
    pub source: PlanarSource<'a>,
    pub width: usize,
    pub height: usize,
}

/// A packed frame: `w*h` luma bytes followed by `(w/2)*(h/2)*2` interleaved
/// chroma bytes, V before U per 2x2 block.
#[derive(Debug, Default)]
pub struct PackedFrame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl PackedFrame {
    /// Total byte length implied by `width`/`height`.
    pub fn packed_len(width: usize, height: usize) -> usize {
        width * height + (width * height) / 2
    }

    /// The luma (Y) plane portion of the buffer.
    pub fn luma(&self) -> &[u8] {
        &self.data[..self.width * self.height]
    }
}

/// A grayscale frame pre-rotated into canonical landscape layout.
///
/// `upload_width`/`upload_height` are the texture dimensions after any
/// 90/270 permutation; `rotation_degrees` is kept because the 180 case is
/// corrected later by a render-time transform, not a buffer rewrite.
#[derive(Debug)]
pub struct CanonicalFrame {
    pub data: Vec<u8>,
    pub upload_width: u32,
    pub upload_height: u32,
    pub rotation_degrees: u32,
}
