//! Content-addressed cache of resized banners.
//!
//! Entries are keyed by the SHA-256 of the source bytes plus the target
//! dimensions and hold the resized (pre-overlay) image with a JSON sidecar.
//! Entries are written once through a temp file and never overwritten.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use super::enhance::EnhancementTier;

/// Sidecar metadata stored next to each cached image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntryMeta {
    /// Tier that produced the image.
    pub tier: EnhancementTier,
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// When the entry was written.
    pub created: DateTime<Utc>,
}

/// Cache key for a source at a target size.
pub fn cache_key(source: &[u8], width: u32, height: u32) -> String {
    let digest = Sha256::digest(source);
    format!("{}-{width}x{height}", hex::encode(digest))
}

/// On-disk enhancement cache.
#[derive(Debug, Clone)]
pub struct EnhancementCache {
    dir: PathBuf,
}

impl EnhancementCache {
    /// Creates a cache rooted at `dir`; the folder is created on first write.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Cache folder.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn image_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.png"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Looks up an entry; a miss is `Ok(None)`.
    pub fn get(&self, key: &str) -> Result<Option<(RgbaImage, EnhancementTier)>> {
        let image_path = self.image_path(key);
        let meta_path = self.meta_path(key);
        if !image_path.exists() || !meta_path.exists() {
            return Ok(None);
        }

        let meta_json = std::fs::read_to_string(&meta_path)
            .with_context(|| format!("Failed to read cache metadata: {}", meta_path.display()))?;
        let meta: CacheEntryMeta = serde_json::from_str(&meta_json)
            .with_context(|| format!("Failed to parse cache metadata: {}", meta_path.display()))?;

        let image = image::open(&image_path)
            .with_context(|| format!("Failed to read cached image: {}", image_path.display()))?
            .to_rgba8();
        if image.dimensions() != (meta.width, meta.height) {
            anyhow::bail!(
                "Cached image {} is {:?}, metadata says {}x{}",
                image_path.display(),
                image.dimensions(),
                meta.width,
                meta.height
            );
        }

        debug!(key = %key, tier = %meta.tier, "Enhancement cache hit");
        Ok(Some((image, meta.tier)))
    }

    /// Stores an entry unless one already exists under `key`.
    pub fn put(&self, key: &str, image: &RgbaImage, tier: EnhancementTier) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache directory: {}", self.dir.display()))?;

        let meta = CacheEntryMeta {
            tier,
            width: image.width(),
            height: image.height(),
            created: Utc::now(),
        };

        // Image first: readers require both files, so a lone image is a miss.
        let mut image_file = NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary cache file")?;
        image
            .write_to(&mut image_file, ImageFormat::Png)
            .context("Failed to encode cached image")?;
        persist_once(image_file, &self.image_path(key))?;

        let mut meta_file = NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary cache file")?;
        serde_json::to_writer_pretty(&mut meta_file, &meta)
            .context("Failed to write cache metadata")?;
        meta_file.flush().context("Failed to flush cache metadata")?;
        persist_once(meta_file, &self.meta_path(key))?;

        debug!(key = %key, %tier, "Stored enhancement cache entry");
        Ok(())
    }
}

/// Moves a temp file into place without replacing an existing file.
fn persist_once(file: NamedTempFile, path: &Path) -> Result<()> {
    match file.persist_noclobber(path) {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "Cache entry already present");
            Ok(())
        }
        Err(e) => Err(e.error)
            .with_context(|| format!("Failed to persist cache file: {}", path.display())),
    }
}
