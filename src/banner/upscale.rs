//! Tiled learned upscaling.
//!
//! The source is cut into fixed-size tiles with context padding, each padded
//! tile is upscaled by a [`TileModel`], and the unpadded centres are stitched
//! back together. Each tile call gets the remaining time budget, so a stuck
//! backend cannot hold a release past it.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use image::{imageops, RgbaImage};
use tracing::{debug, warn};

use super::enhance::{resize_lanczos, EnhanceError, EnhancementTier, Enhancer};

/// Backend upscaling a single tile by a fixed integer factor.
pub trait TileModel: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Integer upscale factor.
    fn scale(&self) -> u32;

    /// Whether the backend can run.
    fn is_available(&self) -> bool;

    /// Upscales one tile within `budget`; the result must be exactly
    /// `scale` times larger.
    fn upscale_tile(&self, tile: &RgbaImage, budget: Duration) -> Result<RgbaImage, EnhanceError>;
}

/// Poll interval while waiting on an external backend.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to wait for a killed backend to be reaped.
const REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// Tier 1 enhancer driving a [`TileModel`] over tiles.
pub struct TiledUpscaler {
    model: Box<dyn TileModel>,
    tile_size: u32,
    padding: u32,
    budget: Duration,
}

impl TiledUpscaler {
    /// Creates an upscaler.
    pub fn new(model: Box<dyn TileModel>, tile_size: u32, padding: u32, budget: Duration) -> Self {
        Self {
            model,
            tile_size: tile_size.max(1),
            padding,
            budget,
        }
    }

    /// Upscales the whole image by the model's factor.
    pub fn upscale(&self, source: &RgbaImage) -> Result<RgbaImage, EnhanceError> {
        let scale = self.model.scale();
        if scale < 2 {
            return Err(EnhanceError::Failed(format!(
                "model {} has scale {scale}",
                self.model.name()
            )));
        }

        let (width, height) = source.dimensions();
        let mut output = RgbaImage::new(width * scale, height * scale);
        let started = Instant::now();
        let mut tiles = 0usize;

        for ty in (0..height).step_by(self.tile_size as usize) {
            for tx in (0..width).step_by(self.tile_size as usize) {
                let remaining = self.budget.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    return Err(EnhanceError::Timeout(self.budget));
                }

                let tw = self.tile_size.min(width - tx);
                let th = self.tile_size.min(height - ty);

                let px = tx.saturating_sub(self.padding);
                let py = ty.saturating_sub(self.padding);
                let pw = (tx + tw + self.padding).min(width) - px;
                let ph = (ty + th + self.padding).min(height) - py;

                let padded = imageops::crop_imm(source, px, py, pw, ph).to_image();
                let upscaled = match self.model.upscale_tile(&padded, remaining) {
                    Err(EnhanceError::Timeout(_)) => return Err(EnhanceError::Timeout(self.budget)),
                    other => other?,
                };
                if upscaled.dimensions() != (pw * scale, ph * scale) {
                    return Err(EnhanceError::Failed(format!(
                        "model {} returned {:?} for a {pw}x{ph} tile",
                        self.model.name(),
                        upscaled.dimensions()
                    )));
                }

                let centre = imageops::crop_imm(
                    &upscaled,
                    (tx - px) * scale,
                    (ty - py) * scale,
                    tw * scale,
                    th * scale,
                )
                .to_image();
                imageops::replace(
                    &mut output,
                    &centre,
                    i64::from(tx * scale),
                    i64::from(ty * scale),
                );
                tiles += 1;
            }
        }

        debug!(
            model = self.model.name(),
            tiles,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tiled upscale complete"
        );
        Ok(output)
    }
}

impl Enhancer for TiledUpscaler {
    fn tier(&self) -> EnhancementTier {
        EnhancementTier::Learned
    }

    fn is_available(&self) -> bool {
        self.model.is_available()
    }

    fn attempt(&self, source: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, EnhanceError> {
        let upscaled = self.upscale(source)?;
        if upscaled.dimensions() == (width, height) {
            return Ok(upscaled);
        }
        resize_lanczos(&upscaled, width, height)
    }
}

/// External super-resolution executable, invoked once per tile through temp
/// files (`<command> -i in.png -o out.png -s <scale> [-n <model>]`).
#[derive(Debug, Clone)]
pub struct CommandTileModel {
    command: String,
    model: Option<String>,
    scale: u32,
}

impl CommandTileModel {
    /// Creates a model backed by `command`.
    pub fn new(command: &str, model: Option<String>, scale: u32) -> Self {
        Self {
            command: command.to_string(),
            model,
            scale,
        }
    }

    fn executable(&self) -> Option<PathBuf> {
        let command = Path::new(&self.command);
        if command.components().count() > 1 {
            return command.is_file().then(|| command.to_path_buf());
        }
        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(&self.command))
            .find(|candidate| candidate.is_file())
    }
}

impl TileModel for CommandTileModel {
    fn name(&self) -> &str {
        &self.command
    }

    fn scale(&self) -> u32 {
        self.scale
    }

    fn is_available(&self) -> bool {
        self.executable().is_some()
    }

    fn upscale_tile(&self, tile: &RgbaImage, budget: Duration) -> Result<RgbaImage, EnhanceError> {
        let executable = self
            .executable()
            .ok_or_else(|| EnhanceError::Unavailable(self.command.clone()))?;

        let scratch = tempfile::tempdir().map_err(|e| EnhanceError::Failed(e.to_string()))?;
        let input = scratch.path().join("tile.png");
        let output = scratch.path().join("tile_out.png");
        let stderr_path = scratch.path().join("stderr.log");
        tile.save(&input)
            .map_err(|e| EnhanceError::Failed(format!("failed to write tile: {e}")))?;

        let mut command = Command::new(executable);
        command
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-s")
            .arg(self.scale.to_string());
        if let Some(model) = &self.model {
            command.arg("-n").arg(model);
        }

        // Stderr goes to a file so a chatty backend never blocks on a full pipe.
        let stderr = File::create(&stderr_path)
            .map_err(|e| EnhanceError::Failed(format!("failed to create stderr log: {e}")))?;
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| EnhanceError::Failed(format!("failed to run {}: {e}", self.command)))?;

        let status = wait_with_deadline(&mut child, budget)
            .map_err(|e| EnhanceError::Failed(format!("failed to wait for {}: {e}", self.command)))?
            .ok_or_else(|| {
                warn!(command = %self.command, ?budget, "Upscaler exceeded its time budget, killed");
                EnhanceError::Timeout(budget)
            })?;
        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(EnhanceError::Failed(format!(
                "{} exited with {}: {}",
                self.command,
                status,
                stderr.trim()
            )));
        }

        image::open(&output)
            .map(|image| image.to_rgba8())
            .map_err(|e| EnhanceError::Failed(format!("failed to read upscaled tile: {e}")))
    }
}

/// Waits for `child` until `budget` runs out. On timeout the child is killed,
/// reaped within [`REAP_TIMEOUT`], and `None` is returned.
fn wait_with_deadline(child: &mut Child, budget: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + budget;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    let _ = child.kill();
    let reap_deadline = Instant::now() + REAP_TIMEOUT;
    while Instant::now() < reap_deadline {
        if child.try_wait()?.is_some() {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    Ok(None)
}
