//! Banner composition: crop, resize/enhance, score, overlay, encode.

pub mod cache;
pub mod crop;
pub mod enhance;
pub mod overlay;
pub mod quality;
pub mod upscale;

use std::io::Cursor;
use std::path::Path;

use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BannerConfig, PressConfig};
pub use cache::EnhancementCache;
pub use crop::{centered_crop, CropRect};
pub use enhance::{EnhanceError, EnhancementChain, EnhancementTier, Enhancer};
pub use overlay::LogoOverlay;
pub use quality::quality_score;

/// Failures that prevent a banner from being produced.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Source bytes are not a decodable image.
    #[error("failed to decode source image")]
    Decode(#[source] image::ImageError),

    /// Source decoded to a zero-sized image.
    #[error("source image has no pixels")]
    EmptySource,

    /// Every resize tier failed.
    #[error("failed to resize source image: {0}")]
    Resize(String),

    /// Final PNG encoding failed.
    #[error("failed to encode banner")]
    Encode(#[source] image::ImageError),
}

/// A finished banner.
#[derive(Debug, Clone, Serialize)]
pub struct BannerAsset {
    /// Output width, always the configured target.
    pub width: u32,
    /// Output height, always the configured target.
    pub height: u32,
    /// Region of the source that was kept.
    pub crop: CropRect,
    /// Resize tier that produced the pixels.
    pub tier: EnhancementTier,
    /// Target size over cropped source size.
    pub scale_factor: f64,
    /// Advisory quality, 0-100.
    pub quality: u8,
    /// Whether the resized pixels came from the cache.
    pub from_cache: bool,
    /// Encoded PNG.
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Turns screenshot bytes into a banner of fixed size.
pub struct BannerCompositor {
    target: BannerConfig,
    chain: EnhancementChain,
    logo: Option<LogoOverlay>,
    cache: Option<EnhancementCache>,
}

impl BannerCompositor {
    /// Creates a compositor with no logo and no cache.
    pub fn new(target: BannerConfig, chain: EnhancementChain) -> Self {
        Self {
            target,
            chain,
            logo: None,
            cache: None,
        }
    }

    /// Builds a compositor from configuration. A logo that cannot be loaded
    /// is logged and skipped.
    pub fn from_config(config: &PressConfig, repo_root: &Path) -> Self {
        let mut compositor = Self::new(
            config.banner,
            EnhancementChain::from_config(&config.enhancement),
        );

        if let Some(logo) = &config.logo {
            let path = PressConfig::resolve_path(repo_root, &logo.path);
            match LogoOverlay::load(&path, logo) {
                Ok(overlay) => compositor = compositor.with_logo(overlay),
                Err(e) => warn!(error = %format!("{e:#}"), "Skipping logo overlay"),
            }
        }

        if config.enhancement.cache_enabled {
            let dir = PressConfig::resolve_path(repo_root, &config.enhancement.cache_dir);
            compositor = compositor.with_cache(EnhancementCache::new(dir));
        }

        compositor
    }

    /// Adds a logo overlay.
    pub fn with_logo(mut self, logo: LogoOverlay) -> Self {
        self.logo = Some(logo);
        self
    }

    /// Adds an enhancement cache.
    pub fn with_cache(mut self, cache: EnhancementCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Target banner size.
    pub fn target(&self) -> BannerConfig {
        self.target
    }

    /// Produces a banner of exactly the target size from encoded image bytes.
    pub fn compose(&self, source: &[u8]) -> Result<BannerAsset, AssetError> {
        let (width, height) = (self.target.width, self.target.height);

        let decoded = image::load_from_memory(source).map_err(AssetError::Decode)?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(AssetError::EmptySource);
        }
        let has_alpha = decoded.color().has_alpha();
        let rgba = decoded.to_rgba8();

        let crop = centered_crop(rgba.width(), rgba.height(), width, height);
        let cropped = if crop.is_full(rgba.width(), rgba.height()) {
            rgba
        } else {
            imageops::crop_imm(&rgba, crop.x, crop.y, crop.width, crop.height).to_image()
        };
        let scale_factor = quality::scale_factor(crop.width, crop.height, width, height);
        debug!(?crop, scale_factor, "Cropped source");

        let (mut banner, tier, from_cache) = self.resize(source, &cropped)?;

        let quality = quality_score(crop.width, crop.height, width, height);

        if let Some(logo) = &self.logo {
            logo.apply(&mut banner);
        }

        let bytes = encode_png(banner, has_alpha)?;

        info!(
            width,
            height,
            %tier,
            scale_factor,
            quality,
            from_cache,
            "Composed banner"
        );

        Ok(BannerAsset {
            width,
            height,
            crop,
            tier,
            scale_factor,
            quality,
            from_cache,
            bytes,
        })
    }

    fn resize(
        &self,
        source: &[u8],
        cropped: &RgbaImage,
    ) -> Result<(RgbaImage, EnhancementTier, bool), AssetError> {
        let (width, height) = (self.target.width, self.target.height);
        let key = cache::cache_key(source, width, height);

        if let Some(cache) = &self.cache {
            match cache.get(&key) {
                Ok(Some((image, tier))) => return Ok((image, tier, true)),
                Ok(None) => {}
                Err(e) => warn!(error = %format!("{e:#}"), "Ignoring unreadable cache entry"),
            }
        }

        let (image, tier) = self.chain.run(cropped, width, height)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&key, &image, tier) {
                warn!(error = %format!("{e:#}"), "Failed to store enhancement cache entry");
            }
        }

        Ok((image, tier, false))
    }
}

/// Encodes the banner as PNG, dropping the alpha channel for opaque sources.
fn encode_png(banner: RgbaImage, keep_alpha: bool) -> Result<Vec<u8>, AssetError> {
    let image = if keep_alpha {
        DynamicImage::ImageRgba8(banner)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(banner).to_rgb8())
    };

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(AssetError::Encode)?;
    Ok(bytes)
}
