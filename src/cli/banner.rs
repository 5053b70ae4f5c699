//! Banner command: composes a banner from one image, outside any release.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use super::GlobalArgs;
use crate::banner::BannerCompositor;
use crate::config::PressConfig;
use crate::data::to_yaml;

/// Banner command options.
#[derive(Parser)]
pub struct BannerCommand {
    /// Source screenshot.
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,
    /// Output PNG file.
    #[arg(long, short = 'o', value_name = "FILE", default_value = "banner.png")]
    pub output: PathBuf,
    /// Overrides the configured banner width.
    #[arg(long)]
    pub width: Option<u32>,
    /// Overrides the configured banner height.
    #[arg(long)]
    pub height: Option<u32>,
    /// Skips the configured logo overlay.
    #[arg(long)]
    pub no_logo: bool,
}

impl BannerCommand {
    /// Executes the banner command.
    pub fn execute(self, global: &GlobalArgs) -> Result<()> {
        let root = global.project_root();
        let mut config = PressConfig::load(&root, global.config.as_deref())?;
        if let Some(width) = self.width {
            config.banner.width = width;
        }
        if let Some(height) = self.height {
            config.banner.height = height;
        }
        if self.no_logo {
            config.logo = None;
        }
        config.validate()?;

        let source = std::fs::read(&self.image)
            .with_context(|| format!("Failed to read image: {}", self.image.display()))?;
        let asset = BannerCompositor::from_config(&config, &root)
            .compose(&source)
            .with_context(|| format!("Failed to build a banner from {}", self.image.display()))?;

        std::fs::write(&self.output, &asset.bytes)
            .with_context(|| format!("Failed to write banner: {}", self.output.display()))?;

        println!("✅ Wrote {}", self.output.display());
        print!("{}", to_yaml(&asset)?);
        Ok(())
    }
}
