//! Pure calculation functions for image geometry and pixels.
//!
//! All functions here are pure and testable without any I/O or images.

/// A crop rectangle already clamped to the image, in `image` crate terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clamp a `(left, top, right, bottom)` rectangle to an image of `size`.
///
/// Returns `None` when the rectangle is empty or lies entirely outside the
/// image. A rectangle that only partly overlaps is clamped to the overlap.
///
/// ```
/// # use imgroute::imaging::{clamp_crop, CropBox};
/// // Partly outside a 100x100 image: clamped to the visible part
/// assert_eq!(
///     clamp_crop((-10, 50, 40, 150), (100, 100)),
///     Some(CropBox { x: 0, y: 50, width: 40, height: 50 })
/// );
///
/// // Right edge left of the image
/// assert_eq!(clamp_crop((-20, 0, 0, 10), (100, 100)), None);
/// ```
pub fn clamp_crop(rect: (i64, i64, i64, i64), size: (u32, u32)) -> Option<CropBox> {
    let (left, top, right, bottom) = rect;
    let (width, height) = (i64::from(size.0), i64::from(size.1));

    if left >= right || left >= width || right <= 0 || top >= bottom || top >= height || bottom <= 0
    {
        return None;
    }

    let (left, top) = (left.max(0), top.max(0));
    let (right, bottom) = (right.min(width), bottom.min(height));
    Some(CropBox {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}

/// A right-angle rotation, counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Quarter,
    Half,
    ThreeQuarters,
}

/// Normalise `angle` degrees to a [`Rotation`], or `None` if it isn't a multiple of 90.
///
/// Negative angles rotate clockwise: `-90` is the same as `270`.
pub fn normalize_rotation(angle: i64) -> Option<Rotation> {
    match angle.rem_euclid(360) {
        0 => Some(Rotation::None),
        90 => Some(Rotation::Quarter),
        180 => Some(Rotation::Half),
        270 => Some(Rotation::ThreeQuarters),
        _ => None,
    }
}

/// Composite one RGBA pixel over an opaque background colour.
pub fn blend_over(background: [u8; 3], pixel: [u8; 4]) -> [u8; 3] {
    let alpha = u32::from(pixel[3]);
    let mut out = [0u8; 3];
    for i in 0..3 {
        let fg = u32::from(pixel[i]);
        let bg = u32::from(background[i]);
        // Rounded integer blend: (fg * a + bg * (255 - a)) / 255
        out[i] = ((fg * alpha + bg * (255 - alpha) + 127) / 255) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // clamp_crop tests
    // =========================================================================

    #[test]
    fn crop_inside_image_is_unchanged() {
        assert_eq!(
            clamp_crop((10, 20, 60, 80), (100, 100)),
            Some(CropBox {
                x: 10,
                y: 20,
                width: 50,
                height: 60
            })
        );
    }

    #[test]
    fn crop_whole_image() {
        assert_eq!(
            clamp_crop((0, 0, 200, 150), (200, 150)),
            Some(CropBox {
                x: 0,
                y: 0,
                width: 200,
                height: 150
            })
        );
    }

    #[test]
    fn crop_partially_outside_is_clamped() {
        assert_eq!(
            clamp_crop((50, -30, 250, 60), (200, 100)),
            Some(CropBox {
                x: 50,
                y: 0,
                width: 150,
                height: 60
            })
        );
    }

    #[test]
    fn crop_empty_rect_rejected() {
        assert_eq!(clamp_crop((10, 10, 10, 20), (100, 100)), None);
        assert_eq!(clamp_crop((10, 20, 20, 20), (100, 100)), None);
        assert_eq!(clamp_crop((30, 10, 20, 20), (100, 100)), None);
    }

    #[test]
    fn crop_entirely_outside_rejected() {
        assert_eq!(clamp_crop((100, 0, 150, 10), (100, 100)), None);
        assert_eq!(clamp_crop((0, 100, 10, 150), (100, 100)), None);
        assert_eq!(clamp_crop((-50, 0, 0, 10), (100, 100)), None);
        assert_eq!(clamp_crop((0, -50, 10, 0), (100, 100)), None);
    }

    // =========================================================================
    // rotation tests
    // =========================================================================

    #[test]
    fn rotation_multiples_of_90() {
        assert_eq!(normalize_rotation(0), Some(Rotation::None));
        assert_eq!(normalize_rotation(90), Some(Rotation::Quarter));
        assert_eq!(normalize_rotation(180), Some(Rotation::Half));
        assert_eq!(normalize_rotation(270), Some(Rotation::ThreeQuarters));
    }

    #[test]
    fn rotation_wraps_full_turns() {
        assert_eq!(normalize_rotation(360), Some(Rotation::None));
        assert_eq!(normalize_rotation(720), Some(Rotation::None));
        assert_eq!(normalize_rotation(450), Some(Rotation::Quarter));
        assert_eq!(normalize_rotation(-90), Some(Rotation::ThreeQuarters));
    }

    #[test]
    fn rotation_rejects_other_angles() {
        assert_eq!(normalize_rotation(45), None);
        assert_eq!(normalize_rotation(-1), None);
        assert_eq!(normalize_rotation(359), None);
    }

    // =========================================================================
    // blend_over tests
    // =========================================================================

    #[test]
    fn blend_opaque_pixel_keeps_pixel() {
        assert_eq!(blend_over([255, 0, 0], [10, 20, 30, 255]), [10, 20, 30]);
    }

    #[test]
    fn blend_transparent_pixel_shows_background() {
        assert_eq!(blend_over([255, 0, 0], [10, 20, 30, 0]), [255, 0, 0]);
    }

    #[test]
    fn blend_half_alpha_mixes() {
        // 128/255 of white over black
        assert_eq!(blend_over([0, 0, 0], [255, 255, 255, 128]), [128, 128, 128]);
    }
}
