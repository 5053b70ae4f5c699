//! Press kit configuration loaded from `.patchnote.yaml`.
//!
//! Every field has a default so an absent or partial file still yields a
//! usable configuration. The taxonomy and glob sets are loaded once and
//! treated as read-only for the rest of the run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// File name looked up at the repository root.
pub const CONFIG_FILE_NAME: &str = ".patchnote.yaml";

/// Complete configuration for a press run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressConfig {
    /// Output banner geometry.
    #[serde(default)]
    pub banner: BannerConfig,
    /// Commit classification settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Screenshot resolution settings.
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Category taxonomy used to match screenshots against commits.
    #[serde(default = "default_taxonomy")]
    pub taxonomy: BTreeMap<Category, Vec<String>>,
    /// Resize/enhancement chain settings.
    #[serde(default)]
    pub enhancement: EnhancementConfig,
    /// Optional logo overlay.
    #[serde(default)]
    pub logo: Option<LogoConfig>,
    /// Text generation and deep check model settings.
    #[serde(default)]
    pub ai: AiConfig,
    /// Directory receiving release drafts, relative to the repository root.
    #[serde(default = "default_drafts_dir")]
    pub drafts_dir: PathBuf,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            banner: BannerConfig::default(),
            classifier: ClassifierConfig::default(),
            resolver: ResolverConfig::default(),
            taxonomy: default_taxonomy(),
            enhancement: EnhancementConfig::default(),
            logo: None,
            ai: AiConfig::default(),
            drafts_dir: default_drafts_dir(),
        }
    }
}

/// Target banner dimensions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BannerConfig {
    /// Output width in pixels.
    #[serde(default = "default_banner_width")]
    pub width: u32,
    /// Output height in pixels.
    #[serde(default = "default_banner_height")]
    pub height: u32,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            width: default_banner_width(),
            height: default_banner_height(),
        }
    }
}

/// Path globs steering the commit classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Paths whose changes make a commit player-facing.
    #[serde(default = "default_content_globs")]
    pub content_globs: Vec<String>,
    /// Paths that never upgrade a commit (tests, docs, CI).
    #[serde(default = "default_ignored_globs")]
    pub ignored_globs: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            content_globs: default_content_globs(),
            ignored_globs: default_ignored_globs(),
        }
    }
}

/// Screenshot resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Directories holding promotional screenshots.
    #[serde(default = "default_promotional_globs")]
    pub promotional_globs: Vec<String>,
    /// Width below which a warning is attached.
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    /// Height below which a warning is attached.
    #[serde(default = "default_min_height")]
    pub min_height: u32,
    /// File size above which a warning is attached.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Shared taxonomy categories required for a keyword `match`.
    #[serde(default = "default_min_shared_categories")]
    pub min_shared_categories: usize,
    /// Optional slow content check for inconclusive candidates.
    #[serde(default)]
    pub deep_check: DeepCheckConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            promotional_globs: default_promotional_globs(),
            min_width: default_min_width(),
            min_height: default_min_height(),
            max_file_bytes: default_max_file_bytes(),
            min_shared_categories: default_min_shared_categories(),
            deep_check: DeepCheckConfig::default(),
        }
    }
}

/// Deep content check settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepCheckConfig {
    /// Whether uncertain candidates are sent to the content checker.
    #[serde(default)]
    pub enabled: bool,
    /// Hard timeout for a single check.
    #[serde(default = "default_deep_check_timeout_secs")]
    pub timeout_secs: u64,
    /// Score at or above which the candidate counts as a match.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,
    /// Score below which the candidate is rejected.
    #[serde(default = "default_reject_threshold")]
    pub reject_threshold: f32,
}

impl Default for DeepCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: default_deep_check_timeout_secs(),
            match_threshold: default_match_threshold(),
            reject_threshold: default_reject_threshold(),
        }
    }
}

/// Resize/enhancement chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementConfig {
    /// Learned upscaler backend.
    #[serde(default)]
    pub learned: LearnedUpscalerConfig,
    /// Whether the multi-stage enhancement tier may be used.
    #[serde(default = "default_true")]
    pub enhanced_enabled: bool,
    /// Whether resized images are cached on disk.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    /// Cache folder, relative to the repository root.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            learned: LearnedUpscalerConfig::default(),
            enhanced_enabled: true,
            cache_enabled: true,
            cache_dir: default_cache_dir(),
        }
    }
}

/// External super-resolution executable used as the learned upscaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedUpscalerConfig {
    /// Whether the learned tier is attempted at all.
    #[serde(default)]
    pub enabled: bool,
    /// Executable name or path, e.g. `realesrgan-ncnn-vulkan`.
    #[serde(default = "default_upscaler_command")]
    pub command: String,
    /// Model name passed to the executable.
    #[serde(default)]
    pub model: Option<String>,
    /// Integer upscale factor of the model.
    #[serde(default = "default_upscaler_scale")]
    pub scale: u32,
    /// Tile edge in source pixels.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Context padding added around each tile.
    #[serde(default = "default_tile_padding")]
    pub tile_padding: u32,
    /// Time budget for the whole upscale.
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,
}

impl Default for LearnedUpscalerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_upscaler_command(),
            model: None,
            scale: default_upscaler_scale(),
            tile_size: default_tile_size(),
            tile_padding: default_tile_padding(),
            time_budget_secs: default_time_budget_secs(),
        }
    }
}

/// Logo placement on the finished banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoConfig {
    /// Logo image, relative to the repository root.
    pub path: PathBuf,
    /// Anchor position.
    #[serde(default)]
    pub position: LogoPosition,
    /// Logo width as a percentage of banner width.
    #[serde(default = "default_logo_size_percent")]
    pub size_percent: f32,
    /// Margin from the banner edge as a percentage of banner width.
    #[serde(default = "default_logo_margin_percent")]
    pub margin_percent: f32,
    /// Drop shadow behind the logo.
    #[serde(default)]
    pub shadow: ShadowConfig,
}

/// Logo anchor positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    /// Top left corner.
    TopLeft,
    /// Top right corner.
    TopRight,
    /// Bottom left corner.
    BottomLeft,
    /// Bottom right corner.
    #[default]
    BottomRight,
    /// Centered on the banner.
    Center,
}

/// Drop shadow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// Whether the shadow is drawn.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Shadow offset in pixels, applied down and right.
    #[serde(default = "default_shadow_offset")]
    pub offset: u32,
    /// Gaussian blur sigma.
    #[serde(default = "default_shadow_blur")]
    pub blur_sigma: f32,
    /// Shadow opacity in 0.0..=1.0.
    #[serde(default = "default_shadow_opacity")]
    pub opacity: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            offset: default_shadow_offset(),
            blur_sigma: default_shadow_blur(),
            opacity: default_shadow_opacity(),
        }
    }
}

/// Model settings for the AI collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Claude model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in a generated announcement.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Optional file with background text about the game.
    #[serde(default)]
    pub game_context: Option<PathBuf>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            game_context: None,
        }
    }
}

/// Screenshot taxonomy categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Core mechanics, quests, items.
    Gameplay,
    /// HUD and interface.
    Ui,
    /// Heroes, enemies, NPCs.
    Character,
    /// Maps, biomes, scenery.
    Environment,
    /// Weapons, fights, abilities.
    Combat,
    /// Menus and options.
    Menu,
    /// Cinematics and story.
    Cutscene,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gameplay => "gameplay",
            Self::Ui => "ui",
            Self::Character => "character",
            Self::Environment => "environment",
            Self::Combat => "combat",
            Self::Menu => "menu",
            Self::Cutscene => "cutscene",
        };
        f.write_str(name)
    }
}

impl PressConfig {
    /// Loads configuration from an explicit path, or from
    /// `<repo_root>/.patchnote.yaml` when present, or defaults.
    pub fn load(repo_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => repo_root.join(CONFIG_FILE_NAME),
        };

        let config = if path.exists() {
            debug!(path = %path.display(), "Loading configuration");
            crate::data::read_yaml_file::<Self, _>(&path)?
        } else if explicit.is_some() {
            bail!("Configuration file not found: {}", path.display());
        } else {
            debug!("No configuration file, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that cannot produce a banner.
    pub fn validate(&self) -> Result<()> {
        if self.banner.width == 0 || self.banner.height == 0 {
            bail!(
                "Banner dimensions must be non-zero (got {}x{})",
                self.banner.width,
                self.banner.height
            );
        }

        let deep = &self.resolver.deep_check;
        if !(0.0..=1.0).contains(&deep.match_threshold)
            || !(0.0..=1.0).contains(&deep.reject_threshold)
        {
            bail!("Deep check thresholds must lie in 0.0..=1.0");
        }
        if deep.reject_threshold > deep.match_threshold {
            bail!(
                "Deep check reject_threshold ({}) must not exceed match_threshold ({})",
                deep.reject_threshold,
                deep.match_threshold
            );
        }

        let learned = &self.enhancement.learned;
        if learned.scale < 2 {
            bail!("Learned upscaler scale must be at least 2");
        }
        if learned.tile_size == 0 {
            bail!("Learned upscaler tile_size must be non-zero");
        }

        if let Some(logo) = &self.logo {
            if !(0.0..=100.0).contains(&logo.size_percent) || logo.size_percent == 0.0 {
                bail!("Logo size_percent must lie in (0, 100]");
            }
        }

        Ok(())
    }

    /// Resolves a configured path against the repository root.
    pub fn resolve_path(repo_root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            repo_root.join(path)
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_banner_width() -> u32 {
    800
}

fn default_banner_height() -> u32 {
    450
}

fn default_drafts_dir() -> PathBuf {
    PathBuf::from(".patchnote/drafts")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".patchnote/cache")
}

fn default_content_globs() -> Vec<String> {
    [
        "assets/**",
        "levels/**",
        "data/**",
        "content/**",
        "maps/**",
        "**/Assets/**",
        "**/Content/**",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_ignored_globs() -> Vec<String> {
    [
        "test/**",
        "tests/**",
        "**/test/**",
        "**/tests/**",
        "docs/**",
        "doc/**",
        ".github/**",
        ".gitlab-ci.yml",
        "ci/**",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_promotional_globs() -> Vec<String> {
    [
        "**/screenshots/**",
        "**/screenshot/**",
        "**/promo/**",
        "**/marketing/**",
        "**/press/**",
        "art/**",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_min_width() -> u32 {
    1280
}

fn default_min_height() -> u32 {
    720
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_min_shared_categories() -> usize {
    1
}

fn default_deep_check_timeout_secs() -> u64 {
    20
}

fn default_match_threshold() -> f32 {
    0.6
}

fn default_reject_threshold() -> f32 {
    0.25
}

fn default_upscaler_command() -> String {
    "realesrgan-ncnn-vulkan".to_string()
}

fn default_upscaler_scale() -> u32 {
    4
}

fn default_tile_size() -> u32 {
    256
}

fn default_tile_padding() -> u32 {
    16
}

fn default_time_budget_secs() -> u64 {
    60
}

fn default_logo_size_percent() -> f32 {
    15.0
}

fn default_logo_margin_percent() -> f32 {
    3.0
}

fn default_shadow_offset() -> u32 {
    4
}

fn default_shadow_blur() -> f32 {
    3.0
}

fn default_shadow_opacity() -> f32 {
    0.6
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

/// Built-in keyword taxonomy.
pub fn default_taxonomy() -> BTreeMap<Category, Vec<String>> {
    let table: [(Category, &[&str]); 7] = [
        (
            Category::Gameplay,
            &[
                "gameplay", "mechanic", "quest", "mission", "ability", "skill", "item", "loot",
                "craft", "crafting", "puzzle", "level", "objective", "powerup",
            ],
        ),
        (
            Category::Ui,
            &[
                "ui", "hud", "interface", "inventory", "button", "icon", "tooltip", "minimap",
                "healthbar", "overlay",
            ],
        ),
        (
            Category::Character,
            &[
                "character", "hero", "player", "npc", "enemy", "boss", "dragon", "creature",
                "avatar", "skin", "outfit", "companion", "monster",
            ],
        ),
        (
            Category::Environment,
            &[
                "environment", "map", "world", "terrain", "biome", "forest", "dungeon", "castle",
                "weather", "lighting", "landscape", "cave", "village", "city",
            ],
        ),
        (
            Category::Combat,
            &[
                "combat", "weapon", "attack", "damage", "sword", "spell", "fight", "battle",
                "shield", "bow", "gun", "parry", "combo",
            ],
        ),
        (
            Category::Menu,
            &[
                "menu", "settings", "options", "title", "pause", "lobby", "mainmenu", "savegame",
            ],
        ),
        (
            Category::Cutscene,
            &[
                "cutscene", "cinematic", "intro", "ending", "trailer", "story", "dialogue",
                "dialog", "cinema",
            ],
        ),
    ];

    table
        .into_iter()
        .map(|(category, words)| {
            (
                category,
                words.iter().map(ToString::to_string).collect::<Vec<_>>(),
            )
        })
        .collect()
}
