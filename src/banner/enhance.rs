//! Tiered resize/enhancement chain.
//!
//! Tiers are tried best first. Each failure falls through to the next tier;
//! the last tier, plain interpolation, is always available. Downscaling goes
//! straight to interpolation.

use std::time::Duration;

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};
use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::quality::scale_factor;
use super::upscale::{CommandTileModel, TiledUpscaler};
use super::AssetError;
use crate::config::EnhancementConfig;

/// Which strategy produced the resized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementTier {
    /// Tiled learned super-resolution.
    Learned,
    /// Lanczos resize with denoise, sharpening and contrast normalization.
    Enhanced,
    /// Plain SIMD Lanczos interpolation.
    Interpolation,
}

impl std::fmt::Display for EnhancementTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Learned => "learned",
            Self::Enhanced => "enhanced",
            Self::Interpolation => "interpolation",
        };
        f.write_str(name)
    }
}

/// Why a tier could not produce an image.
#[derive(Debug, Error)]
pub enum EnhanceError {
    /// Backend missing or disabled.
    #[error("enhancement backend unavailable: {0}")]
    Unavailable(String),

    /// Time budget exhausted.
    #[error("enhancement timed out after {0:?}")]
    Timeout(Duration),

    /// Backend ran and failed.
    #[error("enhancement failed: {0}")]
    Failed(String),
}

/// One resize strategy in the chain.
pub trait Enhancer: Send + Sync {
    /// Tier this strategy represents.
    fn tier(&self) -> EnhancementTier;

    /// Whether the backend can run on this machine.
    fn is_available(&self) -> bool {
        true
    }

    /// Resizes `source` to exactly `width`x`height`.
    fn attempt(&self, source: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, EnhanceError>;
}

/// Ordered list of enhancers ending in plain interpolation.
pub struct EnhancementChain {
    tiers: Vec<Box<dyn Enhancer>>,
}

impl EnhancementChain {
    /// Builds a chain from explicit tiers; interpolation is appended when
    /// missing.
    pub fn new(mut tiers: Vec<Box<dyn Enhancer>>) -> Self {
        if !tiers
            .iter()
            .any(|t| t.tier() == EnhancementTier::Interpolation)
        {
            tiers.push(Box::new(Interpolation));
        }
        Self { tiers }
    }

    /// Builds the chain described by configuration.
    pub fn from_config(config: &EnhancementConfig) -> Self {
        let mut tiers: Vec<Box<dyn Enhancer>> = Vec::new();

        if config.learned.enabled {
            let learned = &config.learned;
            let model = CommandTileModel::new(&learned.command, learned.model.clone(), learned.scale);
            tiers.push(Box::new(TiledUpscaler::new(
                Box::new(model),
                learned.tile_size,
                learned.tile_padding,
                Duration::from_secs(learned.time_budget_secs),
            )));
        }
        if config.enhanced_enabled {
            tiers.push(Box::new(Enhanced::default()));
        }

        Self::new(tiers)
    }

    /// Tiers in the order they are tried.
    pub fn tiers(&self) -> impl Iterator<Item = EnhancementTier> + '_ {
        self.tiers.iter().map(|t| t.tier())
    }

    /// Resizes `source` to the target, returning the tier that succeeded.
    pub fn run(
        &self,
        source: &RgbaImage,
        width: u32,
        height: u32,
    ) -> Result<(RgbaImage, EnhancementTier), AssetError> {
        let scale = scale_factor(source.width(), source.height(), width, height);

        if scale <= 1.0 {
            debug!(scale, "Downscaling with interpolation");
            let image = resize_lanczos(source, width, height)
                .map_err(|e| AssetError::Resize(e.to_string()))?;
            return Ok((image, EnhancementTier::Interpolation));
        }

        for enhancer in &self.tiers {
            let tier = enhancer.tier();
            if !enhancer.is_available() {
                info!(%tier, "Enhancement tier unavailable, falling through");
                continue;
            }

            match enhancer.attempt(source, width, height) {
                Ok(image) if image.dimensions() == (width, height) => {
                    info!(%tier, scale, "Enhancement tier succeeded");
                    return Ok((image, tier));
                }
                Ok(image) => {
                    warn!(
                        %tier,
                        got = ?image.dimensions(),
                        want = ?(width, height),
                        "Enhancement tier returned wrong dimensions, falling through"
                    );
                }
                Err(e) => {
                    warn!(%tier, error = %e, "Enhancement tier failed, falling through");
                }
            }
        }

        // Only reachable when the interpolation tier itself failed.
        Err(AssetError::Resize(
            "every enhancement tier failed".to_string(),
        ))
    }
}

/// Tier 3: SIMD Lanczos3 interpolation.
#[derive(Debug, Default, Clone, Copy)]
pub struct Interpolation;

impl Enhancer for Interpolation {
    fn tier(&self) -> EnhancementTier {
        EnhancementTier::Interpolation
    }

    fn attempt(&self, source: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, EnhanceError> {
        resize_lanczos(source, width, height)
    }
}

/// Tier 2: Lanczos3 resize followed by light cleanup filters.
#[derive(Debug, Clone, Copy)]
pub struct Enhanced {
    /// Gaussian sigma of the noise-reduction blur.
    pub denoise_sigma: f32,
    /// Gaussian sigma of the unsharp mask.
    pub sharpen_sigma: f32,
    /// Unsharp mask threshold.
    pub sharpen_threshold: i32,
    /// Gain applied to detail around the local mean.
    pub contrast_gain: f32,
}

impl Default for Enhanced {
    fn default() -> Self {
        Self {
            denoise_sigma: 0.6,
            sharpen_sigma: 1.2,
            sharpen_threshold: 2,
            contrast_gain: 1.15,
        }
    }
}

impl Enhancer for Enhanced {
    fn tier(&self) -> EnhancementTier {
        EnhancementTier::Enhanced
    }

    fn attempt(&self, source: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, EnhanceError> {
        let resized = resize_lanczos(source, width, height)?;
        let denoised = imageops::blur(&resized, self.denoise_sigma);
        let sharpened = imageops::unsharpen(&denoised, self.sharpen_sigma, self.sharpen_threshold);
        Ok(local_contrast(&sharpened, self.contrast_gain))
    }
}

/// Resizes with fast_image_resize Lanczos3, alpha-aware.
pub fn resize_lanczos(source: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, EnhanceError> {
    if width == 0 || height == 0 || source.width() == 0 || source.height() == 0 {
        return Err(EnhanceError::Failed(format!(
            "cannot resize {}x{} to {width}x{height}",
            source.width(),
            source.height()
        )));
    }

    let src = TypedImageRef::<U8x4>::from_buffer(source.width(), source.height(), source.as_raw())
        .map_err(|e| EnhanceError::Failed(e.to_string()))?;

    let mut buffer = vec![0u8; width as usize * height as usize * 4];
    {
        let mut dst = TypedImage::<U8x4>::from_buffer(width, height, &mut buffer)
            .map_err(|e| EnhanceError::Failed(e.to_string()))?;
        let options = ResizeOptions::new()
            .resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3))
            .use_alpha(true);
        Resizer::new()
            .resize_typed::<U8x4>(&src, &mut dst, &options)
            .map_err(|e| EnhanceError::Failed(e.to_string()))?;
    }

    RgbaImage::from_raw(width, height, buffer)
        .ok_or_else(|| EnhanceError::Failed("resized buffer has wrong length".to_string()))
}

/// Amplifies detail around a wide-radius local mean, leaving alpha alone.
fn local_contrast(image: &RgbaImage, gain: f32) -> RgbaImage {
    let sigma = (image.width().max(image.height()) as f32 / 32.0).max(1.0);
    let mean = imageops::blur(image, sigma);

    let mut out = image.clone();
    for (pixel, local) in out.pixels_mut().zip(mean.pixels()) {
        for channel in 0..3 {
            let value = f32::from(pixel[channel]);
            let centre = f32::from(local[channel]);
            pixel[channel] = (centre + (value - centre) * gain).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct Broken(EnhancementTier);

    impl Enhancer for Broken {
        fn tier(&self) -> EnhancementTier {
            self.0
        }

        fn attempt(&self, _: &RgbaImage, _: u32, _: u32) -> Result<RgbaImage, EnhanceError> {
            Err(EnhanceError::Failed("forced".to_string()))
        }
    }

    struct Missing;

    impl Enhancer for Missing {
        fn tier(&self) -> EnhancementTier {
            EnhancementTier::Learned
        }

        fn is_available(&self) -> bool {
            false
        }

        fn attempt(&self, _: &RgbaImage, _: u32, _: u32) -> Result<RgbaImage, EnhanceError> {
            panic!("unavailable tier must not be attempted");
        }
    }

    struct WrongSize;

    impl Enhancer for WrongSize {
        fn tier(&self) -> EnhancementTier {
            EnhancementTier::Learned
        }

        fn attempt(&self, _: &RgbaImage, _: u32, _: u32) -> Result<RgbaImage, EnhanceError> {
            Ok(RgbaImage::new(3, 3))
        }
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 255 / width) as u8, (y * 255 / height) as u8, 128, 255])
        })
    }

    // ── chain ───────────────────────────────────────────────────────

    #[test]
    fn failed_learned_tier_falls_through_to_enhanced() {
        let chain = EnhancementChain::new(vec![
            Box::new(Broken(EnhancementTier::Learned)),
            Box::new(Enhanced::default()),
        ]);
        let (image, tier) = chain.run(&gradient(200, 112), 800, 450).unwrap();
        assert_eq!(tier, EnhancementTier::Enhanced);
        assert_eq!(image.dimensions(), (800, 450));
    }

    #[test]
    fn all_failures_end_at_interpolation() {
        let chain = EnhancementChain::new(vec![
            Box::new(Missing),
            Box::new(Broken(EnhancementTier::Enhanced)),
        ]);
        let (image, tier) = chain.run(&gradient(200, 112), 800, 450).unwrap();
        assert_eq!(tier, EnhancementTier::Interpolation);
        assert_eq!(image.dimensions(), (800, 450));
    }

    #[test]
    fn wrong_dimensions_fall_through() {
        let chain = EnhancementChain::new(vec![Box::new(WrongSize)]);
        let (_, tier) = chain.run(&gradient(100, 56), 320, 180).unwrap();
        assert_eq!(tier, EnhancementTier::Interpolation);
    }

    #[test]
    fn downscale_skips_to_interpolation() {
        let chain = EnhancementChain::new(vec![Box::new(Broken(EnhancementTier::Learned))]);
        let (image, tier) = chain.run(&gradient(1600, 900), 800, 450).unwrap();
        assert_eq!(tier, EnhancementTier::Interpolation);
        assert_eq!(image.dimensions(), (800, 450));
    }

    #[test]
    fn config_chain_order() {
        let mut config = EnhancementConfig::default();
        config.learned.enabled = true;
        let tiers: Vec<_> = EnhancementChain::from_config(&config).tiers().collect();
        assert_eq!(
            tiers,
            vec![
                EnhancementTier::Learned,
                EnhancementTier::Enhanced,
                EnhancementTier::Interpolation
            ]
        );

        config.learned.enabled = false;
        config.enhanced_enabled = false;
        let tiers: Vec<_> = EnhancementChain::from_config(&config).tiers().collect();
        assert_eq!(tiers, vec![EnhancementTier::Interpolation]);
    }

    // ── resize ──────────────────────────────────────────────────────

    #[test]
    fn resize_preserves_flat_colour() {
        let source = RgbaImage::from_pixel(64, 36, Rgba([10, 200, 30, 255]));
        let resized = resize_lanczos(&source, 160, 90).unwrap();
        let centre = resized.get_pixel(80, 45);
        assert!(centre[0].abs_diff(10) <= 1);
        assert!(centre[1].abs_diff(200) <= 1);
        assert_eq!(centre[3], 255);
    }

    #[test]
    fn resize_rejects_empty_target() {
        assert!(resize_lanczos(&gradient(10, 10), 0, 10).is_err());
    }

    #[test]
    fn local_contrast_keeps_alpha() {
        let source = RgbaImage::from_pixel(32, 32, Rgba([100, 100, 100, 77]));
        let out = local_contrast(&source, 1.5);
        assert_eq!(out.get_pixel(5, 5)[3], 77);
    }
}
