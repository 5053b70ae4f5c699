//! Logo overlay with a soft drop shadow.

use std::path::Path;

use anyhow::{Context, Result};
use image::{imageops, Rgba, RgbaImage};
use tracing::{debug, warn};

use super::enhance::resize_lanczos;
use crate::config::{LogoConfig, LogoPosition};

/// A decoded logo and its placement settings.
#[derive(Debug, Clone)]
pub struct LogoOverlay {
    logo: RgbaImage,
    config: LogoConfig,
}

impl LogoOverlay {
    /// Loads the logo image from disk.
    pub fn load(path: &Path, config: &LogoConfig) -> Result<Self> {
        let logo = image::open(path)
            .with_context(|| format!("Failed to load logo: {}", path.display()))?
            .to_rgba8();
        Ok(Self::from_image(logo, config.clone()))
    }

    /// Wraps an already decoded logo.
    pub fn from_image(logo: RgbaImage, config: LogoConfig) -> Self {
        Self { logo, config }
    }

    /// Draws the logo (and its shadow) onto the banner in place.
    pub fn apply(&self, banner: &mut RgbaImage) {
        let (banner_width, banner_height) = banner.dimensions();
        if self.logo.width() == 0 || self.logo.height() == 0 {
            return;
        }

        let width = ((banner_width as f32 * self.config.size_percent / 100.0).round() as u32)
            .clamp(1, banner_width);
        let height = ((width as f32 * self.logo.height() as f32 / self.logo.width() as f32).round()
            as u32)
            .clamp(1, banner_height);

        let scaled = match resize_lanczos(&self.logo, width, height) {
            Ok(scaled) => scaled,
            Err(e) => {
                warn!(error = %e, "Failed to scale logo, skipping overlay");
                return;
            }
        };

        let margin = (banner_width as f32 * self.config.margin_percent / 100.0).round() as u32;
        let (x, y) = placement(
            (banner_width, banner_height),
            (width, height),
            self.config.position,
            margin,
        );

        let shadow = &self.config.shadow;
        if shadow.enabled && shadow.opacity > 0.0 {
            let (image, pad) = drop_shadow(&scaled, shadow.blur_sigma, shadow.opacity);
            let offset = i64::from(shadow.offset);
            imageops::overlay(banner, &image, x - pad + offset, y - pad + offset);
        }
        imageops::overlay(banner, &scaled, x, y);

        debug!(x, y, width, height, position = ?self.config.position, "Applied logo overlay");
    }
}

/// Top-left corner of a logo of `logo` size placed on a banner of `banner`
/// size.
pub fn placement(banner: (u32, u32), logo: (u32, u32), position: LogoPosition, margin: u32) -> (i64, i64) {
    let (bw, bh) = (i64::from(banner.0), i64::from(banner.1));
    let (lw, lh) = (i64::from(logo.0), i64::from(logo.1));
    let m = i64::from(margin);

    match position {
        LogoPosition::TopLeft => (m, m),
        LogoPosition::TopRight => (bw - lw - m, m),
        LogoPosition::BottomLeft => (m, bh - lh - m),
        LogoPosition::BottomRight => (bw - lw - m, bh - lh - m),
        LogoPosition::Center => ((bw - lw) / 2, (bh - lh) / 2),
    }
}

/// Builds a blurred black silhouette of the logo, padded so the blur is not
/// clipped. Returns the shadow and its padding.
fn drop_shadow(logo: &RgbaImage, sigma: f32, opacity: f32) -> (RgbaImage, i64) {
    let pad = (sigma.max(0.0) * 3.0).ceil() as u32;
    let mut silhouette = RgbaImage::new(logo.width() + pad * 2, logo.height() + pad * 2);
    for (x, y, pixel) in logo.enumerate_pixels() {
        let alpha = (f32::from(pixel[3]) * opacity.clamp(0.0, 1.0)).round() as u8;
        silhouette.put_pixel(x + pad, y + pad, Rgba([0, 0, 0, alpha]));
    }

    let blurred = if sigma > 0.0 {
        imageops::blur(&silhouette, sigma)
    } else {
        silhouette
    };
    (blurred, i64::from(pad))
}
