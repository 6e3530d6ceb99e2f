//! Stroke rasterizer
//!
//! Strokes are rendered as capsules: every pixel whose center lies within
//! `radius` of the segment is covered. A segment with equal endpoints is a
//! disc, which is also how round caps and joins fall out of consecutive
//! segments. Coverage is binary so erased pixels end up exactly equal to
//! the background, with no partially blended edge.

use glam::Vec2;
use tracing::debug;

use crate::constants::MIN_STROKE_RADIUS;

/// Affected region as `(x, y, width, height)`
pub type PixelRegion = (u32, u32, u32, u32);

/// Distance from `p` to the segment `a..b`
#[inline]
pub fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Visit every pixel covered by the capsule from `from` to `to`.
///
/// Returns the clamped bounding box that was scanned, or None when the
/// capsule misses the surface entirely.
pub fn for_each_covered_pixel(
    from: Vec2,
    to: Vec2,
    radius: f32,
    width: u32,
    height: u32,
    mut visit: impl FnMut(u32, u32),
) -> Option<PixelRegion> {
    if !from.is_finite() || !to.is_finite() || !radius.is_finite() {
        debug!("for_each_covered_pixel: non-finite input, skipping");
        return None;
    }
    let radius = radius.max(MIN_STROKE_RADIUS);

    let lo = from.min(to) - Vec2::splat(radius);
    let hi = from.max(to) + Vec2::splat(radius);

    let x_min = (lo.x.floor().max(0.0) as u32).min(width);
    let y_min = (lo.y.floor().max(0.0) as u32).min(height);
    let x_max = (hi.x.ceil().max(0.0) as u32).min(width);
    let y_max = (hi.y.ceil().max(0.0) as u32).min(height);

    if x_min >= x_max || y_min >= y_max {
        return None;
    }

    for py in y_min..y_max {
        for px in x_min..x_max {
            let center = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
            if distance_to_segment(center, from, to) <= radius {
                visit(px, py);
            }
        }
    }

    Some((x_min, y_min, x_max - x_min, y_max - y_min))
}

/// Source-over compositing of straight RGBA8 colors.
///
/// An opaque source replaces the destination exactly.
#[inline]
pub fn blend_rgba(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let a = src[3] as u32;
    if a == 255 {
        return src;
    }
    if a == 0 {
        return dst;
    }
    let inv = 255 - a;
    let mix = |s: u8, d: u8| ((s as u32 * a + d as u32 * inv + 127) / 255) as u8;
    let out_a = a + (dst[3] as u32 * inv + 127) / 255;
    [
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        out_a.min(255) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_segment() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Vec2::new(5.0, 3.0), a, b), 3.0);
        // Past the end the distance is to the endpoint (round cap)
        assert_eq!(distance_to_segment(Vec2::new(13.0, 4.0), a, b), 5.0);
        // Degenerate segment is a point
        assert_eq!(distance_to_segment(Vec2::new(3.0, 4.0), a, a), 5.0);
    }

    #[test]
    fn test_disc_coverage_is_symmetric() {
        let mut covered = Vec::new();
        let center = Vec2::new(10.0, 10.0);
        let region = for_each_covered_pixel(center, center, 3.0, 20, 20, |x, y| covered.push((x, y)));

        assert_eq!(region, Some((7, 7, 6, 6)));
        assert!(covered.contains(&(9, 9)));
        assert!(covered.contains(&(10, 10)));
        // Corners of the bounding box are outside the disc
        assert!(!covered.contains(&(7, 7)));
        assert!(!covered.contains(&(12, 12)));
        for &(x, y) in &covered {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            assert!(p.distance(center) <= 3.0);
        }
    }

    #[test]
    fn test_coverage_outside_surface() {
        let mut count = 0;
        let region = for_each_covered_pixel(
            Vec2::new(-50.0, -50.0),
            Vec2::new(-40.0, -40.0),
            2.0,
            10,
            10,
            |_, _| count += 1,
        );
        assert_eq!(region, None);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_coverage_rejects_nan() {
        let region = for_each_covered_pixel(Vec2::new(f32::NAN, 0.0), Vec2::ZERO, 2.0, 10, 10, |_, _| {});
        assert_eq!(region, None);
    }

    #[test]
    fn test_blend_rgba() {
        let white = [255, 255, 255, 255];
        assert_eq!(blend_rgba([10, 20, 30, 255], white), [10, 20, 30, 255]);
        assert_eq!(blend_rgba([10, 20, 30, 0], white), white);

        let half = blend_rgba([255, 0, 0, 128], white);
        assert_eq!(half[0], 255);
        assert!((126..=128).contains(&half[1]));
        assert_eq!(half[3], 255);
    }
}
