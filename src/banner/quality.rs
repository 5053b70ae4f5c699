//! Advisory quality score for a finished banner.

/// Width below which a source is considered barely usable.
pub const USABLE_MIN_WIDTH: u32 = 640;
/// Height below which a source is considered barely usable.
pub const USABLE_MIN_HEIGHT: u32 = 360;

const UPSCALE_PENALTY_PER_UNIT: f64 = 40.0;
const UPSCALE_PENALTY_CAP: f64 = 60.0;
const OVERSAMPLE_BONUS: f64 = 5.0;
const LOW_RESOLUTION_PENALTY: f64 = 20.0;

/// Scores a banner from the cropped source size and the target size.
///
/// Starts at 100, subtracts for upscaling and penalizes sources below the
/// usable floor. Only a crop at least twice the target on both axes can
/// reach 100: every other score is held to `100 - OVERSAMPLE_BONUS` before
/// the bonus is added. Never blocks output.
pub fn quality_score(source_width: u32, source_height: u32, target_width: u32, target_height: u32) -> u8 {
    if source_width == 0 || source_height == 0 {
        return 0;
    }
    let scale = scale_factor(source_width, source_height, target_width, target_height);
    let mut score = 100.0;

    if scale > 1.0 {
        score -= ((scale - 1.0) * UPSCALE_PENALTY_PER_UNIT).min(UPSCALE_PENALTY_CAP);
    }
    if source_width < USABLE_MIN_WIDTH || source_height < USABLE_MIN_HEIGHT {
        score -= LOW_RESOLUTION_PENALTY;
    }

    score = f64::min(score, 100.0 - OVERSAMPLE_BONUS);
    if source_width >= target_width.saturating_mul(2) && source_height >= target_height.saturating_mul(2) {
        score += OVERSAMPLE_BONUS;
    }

    score.clamp(0.0, 100.0).round() as u8
}

/// Linear scale factor from the cropped source to the target.
///
/// Uses the larger of the two axis factors so a banner that needs any
/// upscaling on either axis is treated as upscaled.
pub fn scale_factor(source_width: u32, source_height: u32, target_width: u32, target_height: u32) -> f64 {
    if source_width == 0 || source_height == 0 {
        return f64::INFINITY;
    }
    let x = f64::from(target_width) / f64::from(source_width);
    let y = f64::from(target_height) / f64::from(source_height);
    x.max(y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downscale_keeps_full_score() {
        assert_eq!(quality_score(1920, 1080, 800, 450), 100);
    }

    #[test]
    fn two_x_upscale_loses_forty() {
        assert_eq!(quality_score(400, 225, 800, 450), 40);
    }

    #[test]
    fn penalty_is_capped() {
        // 8x upscale: penalty capped at 60, low-res penalty 20
        assert_eq!(quality_score(100, 56, 800, 450), 20);
    }

    #[test]
    fn small_upscale() {
        // 1.25x: 100 - 10
        assert_eq!(quality_score(640, 360, 800, 450), 90);
    }

    #[test]
    fn slight_downscale_misses_oversample_bonus() {
        // 1.25x larger than the target: no penalty, no bonus
        assert_eq!(quality_score(1000, 563, 800, 450), 95);
        assert!(quality_score(1600, 900, 800, 450) > quality_score(1000, 563, 800, 450));
    }

    #[test]
    fn oversample_bonus_offsets_low_resolution() {
        // tiny target: 80 from the floor penalty, +5 for 2x oversampling
        assert_eq!(quality_score(600, 338, 160, 90), 85);
        assert_eq!(quality_score(300, 169, 160, 90), 80);
    }

    #[test]
    fn wide_crop_scenario() {
        assert_eq!(quality_score(3556, 2000, 800, 450), 100);
    }

    #[test]
    fn empty_source_scores_zero() {
        assert_eq!(quality_score(0, 0, 800, 450), 0);
    }

    #[test]
    fn scale_factor_uses_larger_axis() {
        assert!((scale_factor(1600, 450, 800, 450) - 1.0).abs() < f64::EPSILON);
        assert!((scale_factor(400, 450, 800, 450) - 2.0).abs() < f64::EPSILON);
    }
}
