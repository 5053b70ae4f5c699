//! Aspect-ratio correcting center crop.

use serde::{Deserialize, Serialize};

/// Aspect ratios closer than this are treated as equal.
pub const ASPECT_EPSILON: f64 = 1e-3;

/// Crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width of the kept region.
    pub width: u32,
    /// Height of the kept region.
    pub height: u32,
}

impl CropRect {
    /// Rectangle covering the whole source.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Whether the rectangle keeps the whole source.
    pub fn is_full(&self, width: u32, height: u32) -> bool {
        *self == Self::full(width, height)
    }
}

/// Computes the largest centered region of the source with the target's
/// aspect ratio.
///
/// A wider source loses equal columns on the left and right; a taller source
/// loses equal rows on the top and bottom. Zero-sized inputs yield the full
/// source.
pub fn centered_crop(src_width: u32, src_height: u32, target_width: u32, target_height: u32) -> CropRect {
    if src_width == 0 || src_height == 0 || target_width == 0 || target_height == 0 {
        return CropRect::full(src_width, src_height);
    }

    let src_ratio = f64::from(src_width) / f64::from(src_height);
    let target_ratio = f64::from(target_width) / f64::from(target_height);

    if (src_ratio - target_ratio).abs() <= ASPECT_EPSILON {
        return CropRect::full(src_width, src_height);
    }

    if src_ratio > target_ratio {
        let width = parity_fit(f64::from(src_height) * target_ratio, src_width);
        CropRect {
            x: (src_width - width) / 2,
            y: 0,
            width,
            height: src_height,
        }
    } else {
        let height = parity_fit(f64::from(src_width) / target_ratio, src_height);
        CropRect {
            x: 0,
            y: (src_height - height) / 2,
            width: src_width,
            height,
        }
    }
}

/// Rounds `ideal` to a size in `1..=full` whose difference from `full` is
/// even, so the removed margin splits evenly.
fn parity_fit(ideal: f64, full: u32) -> u32 {
    let mut size = (ideal.round().max(1.0) as u32).min(full);
    if (full - size) % 2 == 1 {
        if size == 1 || f64::from(size) <= ideal {
            size += 1;
        } else {
            size -= 1;
        }
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn matching_ratio_is_untouched() {
        assert_eq!(centered_crop(1920, 1080, 800, 450), CropRect::full(1920, 1080));
    }

    #[test]
    fn near_matching_ratio_is_untouched() {
        // 1366x768 is 1.7786, within epsilon of 16:9
        assert!(centered_crop(1366, 768, 800, 450).is_full(1366, 768));
    }

    #[test]
    fn wide_source_loses_columns() {
        let crop = centered_crop(4000, 2000, 800, 450);
        assert_eq!(
            crop,
            CropRect {
                x: 222,
                y: 0,
                width: 3556,
                height: 2000
            }
        );
    }

    #[test]
    fn tall_source_loses_rows() {
        let crop = centered_crop(1080, 1920, 800, 450);
        assert_eq!(crop.x, 0);
        assert_eq!(crop.width, 1080);
        assert_eq!(crop.height, 608);
        assert_eq!(crop.y, 656);
    }

    #[test]
    fn odd_margins_are_rounded_to_even() {
        // ideal width 1777.8 -> 1778 leaves 223 columns; parity forces 1777
        let crop = centered_crop(2001, 1000, 16, 9);
        assert_eq!((2001 - crop.width) % 2, 0);
        assert_eq!(crop.x * 2 + crop.width, 2001);
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(centered_crop(0, 10, 16, 9), CropRect::full(0, 10));
        assert_eq!(centered_crop(10, 10, 0, 9), CropRect::full(10, 10));
        let crop = centered_crop(3, 1000, 16, 9);
        assert!(crop.height >= 1);
        assert_eq!(crop.y * 2 + crop.height, 1000);
    }

    proptest! {
        #[test]
        fn crop_is_centered_and_in_bounds(
            sw in 64u32..5000,
            sh in 64u32..5000,
            tw in 64u32..2000,
            th in 64u32..2000,
        ) {
            let crop = centered_crop(sw, sh, tw, th);
            prop_assert!(crop.width >= 1 && crop.height >= 1);
            prop_assert!(crop.x + crop.width <= sw);
            prop_assert!(crop.y + crop.height <= sh);
            // Equal margins on the cropped axis, no crop on the other.
            prop_assert_eq!(crop.x * 2 + crop.width, sw);
            prop_assert_eq!(crop.y * 2 + crop.height, sh);
            prop_assert!(crop.x == 0 || crop.y == 0);
        }

        #[test]
        fn crop_matches_target_ratio(
            sw in 64u32..5000,
            sh in 64u32..5000,
            tw in 64u32..2000,
            th in 64u32..2000,
        ) {
            let target = f64::from(tw) / f64::from(th);
            prop_assume!((0.25..=4.0).contains(&target));
            let crop = centered_crop(sw, sh, tw, th);
            let ratio = f64::from(crop.width) / f64::from(crop.height);
            let tolerance = 2.0 / f64::from(crop.width.min(crop.height)) + 0.01;
            prop_assert!((ratio / target - 1.0).abs() <= tolerance);
        }
    }
}
