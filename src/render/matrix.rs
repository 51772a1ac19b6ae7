// Texture-coordinate transforms.
//
// 90/270 rotations are resolved before upload by permuting the buffer; the
// 180 case and the optional vertical mirror are pure reflections of the
// normalized [0,1] texture coordinates, expressed here as 3x3 matrices so
// the shader applies them with a single multiply.

/// Row-major 3x3 matrix over f32.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3(pub [f32; 9]);

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// Point reflection through (0.5, 0.5): the render-time 180 correction.
    pub const ROTATE_180: Mat3 = Mat3([-1.0, 0.0, 1.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0]);

    /// Mirror across the horizontal centre line.
    pub const FLIP_V: Mat3 = Mat3([1.0, 0.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0]);

    /// Row-major product `self * rhs`.
    pub fn mul(&self, rhs: &Mat3) -> Mat3 {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [0.0f32; 9];
        for (r, row) in out.chunks_exact_mut(3).enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| a[r * 3 + k] * b[k * 3 + c]).sum();
            }
        }
        Mat3(out)
    }

    /// Apply to a point in texture space.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let m = &self.0;
        (
            m[0] * x + m[1] * y + m[2],
            m[3] * x + m[4] * y + m[5],
        )
    }

    /// Column-major, vec4-padded layout for a WGSL `mat3x3<f32>` uniform.
    pub fn to_uniform(&self) -> [[f32; 4]; 3] {
        let m = &self.0;
        [
            [m[0], m[3], m[6], 0.0],
            [m[1], m[4], m[7], 0.0],
            [m[2], m[5], m[8], 0.0],
        ]
    }
}

/// Texture-coordinate transform for a frame: identity unless the capture
/// rotation was 180, optionally pre-multiplied by the vertical mirror.
/// Composition order is flip-then-rotate.
pub fn texture_transform(rotation_degrees: u32, vertical_flip: bool) -> Mat3 {
    let base = if rotation_degrees == 180 {
        Mat3::ROTATE_180
    } else {
        Mat3::IDENTITY
    };
    if vertical_flip {
        Mat3::FLIP_V.mul(&base)
    } else {
        base
    }
}

/// Aspect-preserving scale of the unit quad.
///
/// Shrinks exactly one axis so the frame fits the surface without
/// distortion or cropping (letterbox/pillarbox, never stretch). Returns
/// (1.0, 1.0) when either input is degenerate or the ratios already match.
pub fn aspect_scale(frame_w: u32, frame_h: u32, surface_w: u32, surface_h: u32) -> (f32, f32) {
    if frame_w == 0 || frame_h == 0 || surface_w == 0 || surface_h == 0 {
        return (1.0, 1.0);
    }
    let frame_aspect = frame_w as f32 / frame_h as f32;
    let surface_aspect = surface_w as f32 / surface_h as f32;
    if frame_aspect > surface_aspect {
        (1.0, surface_aspect / frame_aspect)
    } else if frame_aspect < surface_aspect {
        (frame_aspect / surface_aspect, 1.0)
    } else {
        (1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    fn assert_mat_eq(a: &Mat3, b: &Mat3) {
        for (x, y) in a.0.iter().zip(b.0.iter()) {
            assert!((x - y).abs() < EPS, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn identity_is_multiplicative_unit() {
        let m = Mat3([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_mat_eq(&Mat3::IDENTITY.mul(&m), &m);
        assert_mat_eq(&m.mul(&Mat3::IDENTITY), &m);
    }

    #[test]
    fn rotate_180_squared_is_identity() {
        let squared = Mat3::ROTATE_180.mul(&Mat3::ROTATE_180);
        assert_mat_eq(&squared, &Mat3::IDENTITY);
    }

    #[test]
    fn rotate_180_reflects_through_centre() {
        let (x, y) = Mat3::ROTATE_180.apply(0.0, 0.0);
        assert!((x - 1.0).abs() < EPS && (y - 1.0).abs() < EPS);
        let (x, y) = Mat3::ROTATE_180.apply(0.25, 0.75);
        assert!((x - 0.75).abs() < EPS && (y - 0.25).abs() < EPS);
    }

    #[test]
    fn flip_v_mirrors_y_only() {
        let (x, y) = Mat3::FLIP_V.apply(0.3, 0.2);
        assert!((x - 0.3).abs() < EPS && (y - 0.8).abs() < EPS);
    }

    #[test]
    fn transform_composes_flip_then_rotate() {
        let m = texture_transform(180, true);
        let expected = Mat3::FLIP_V.mul(&Mat3::ROTATE_180);
        assert_mat_eq(&m, &expected);
        // Flip of a 180 reflection cancels in y: (x, y) -> (1-x, y).
        let (x, y) = m.apply(0.25, 0.4);
        assert!((x - 0.75).abs() < EPS && (y - 0.4).abs() < EPS);
    }

    #[test]
    fn transform_is_identity_for_pre_rotated_frames() {
        assert_mat_eq(&texture_transform(0, false), &Mat3::IDENTITY);
        assert_mat_eq(&texture_transform(90, false), &Mat3::IDENTITY);
        assert_mat_eq(&texture_transform(270, false), &Mat3::IDENTITY);
    }

    #[test]
    fn aspect_scale_never_exceeds_one() {
        for (fw, fh, sw, sh) in [
            (1920u32, 1080u32, 1080u32, 1920u32),
            (640, 480, 1920, 1080),
            (100, 100, 200, 50),
            (4, 4, 16, 9),
        ] {
            let (sx, sy) = aspect_scale(fw, fh, sw, sh);
            assert!(sx <= 1.0 && sy <= 1.0);
            // Exactly one axis stays at 1.0 unless the ratios match.
            assert!((sx - 1.0).abs() < EPS || (sy - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn matching_aspect_scales_both_axes_to_one() {
        let (sx, sy) = aspect_scale(1920, 1080, 960, 540);
        assert_eq!((sx, sy), (1.0, 1.0));
    }

    #[test]
    fn wide_frame_on_tall_surface_letterboxes() {
        let (sx, sy) = aspect_scale(1920, 1080, 1080, 1920);
        assert_eq!(sx, 1.0);
        assert!(sy < 1.0);
    }

    #[test]
    fn degenerate_inputs_scale_to_one() {
        assert_eq!(aspect_scale(0, 1080, 100, 100), (1.0, 1.0));
        assert_eq!(aspect_scale(1920, 1080, 0, 100), (1.0, 1.0));
    }

    #[test]
    fn uniform_layout_is_column_major_padded() {
        let m = Mat3([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let u = m.to_uniform();
        assert_eq!(u[0], [1.0, 4.0, 7.0, 0.0]);
        assert_eq!(u[1], [2.0, 5.0, 8.0, 0.0]);
        assert_eq!(u[2], [3.0, 6.0, 9.0, 0.0]);
    }
}
