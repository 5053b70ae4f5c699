//! Curated keyword buckets for free-form commit messages.

use std::collections::HashSet;

/// Player-facing keyword buckets, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// New mechanics and features.
    Gameplay,
    /// New levels, characters, items.
    Content,
    /// Tuning of numbers and difficulty.
    Balance,
    /// Bug fixes.
    BugFix,
    /// Frame rate, loading, memory.
    Performance,
}

impl Bucket {
    /// All buckets in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Gameplay,
        Self::Content,
        Self::Balance,
        Self::BugFix,
        Self::Performance,
    ];

    /// Keywords belonging to this bucket.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Gameplay => &[
                "add", "added", "adds", "new", "introduce", "introduces", "implement",
                "implements", "feature", "mechanic", "mechanics", "ability", "abilities",
                "gameplay", "mode", "multiplayer", "coop", "controller", "support",
            ],
            Self::Content => &[
                "level", "levels", "map", "maps", "boss", "enemy", "enemies", "character",
                "characters", "quest", "quests", "item", "items", "weapon", "weapons", "skin",
                "skins", "music", "soundtrack", "biome", "area", "chapter", "dungeon",
            ],
            Self::Balance => &[
                "balance", "balancing", "rebalance", "tune", "tuned", "tuning", "nerf", "buff",
                "difficulty", "adjust", "adjusted", "tweak", "tweaked", "cooldown",
            ],
            Self::BugFix => &[
                "fix", "fixed", "fixes", "bug", "bugs", "crash", "crashes", "glitch", "issue",
                "broken", "resolve", "resolved", "exploit", "softlock", "stuck",
            ],
            Self::Performance => &[
                "performance", "perf", "fps", "framerate", "optimize", "optimized",
                "optimise", "faster", "speed", "lag", "stutter", "loading", "memory",
            ],
        }
    }
}

/// Maintenance language that outweighs any player-facing bucket.
pub const INTERNAL_KEYWORDS: &[&str] = &[
    "wip", "merge", "merged", "refactor", "refactored", "refactoring", "cleanup", "typo",
    "typos", "lint", "linter", "clippy", "format", "formatting", "rustfmt", "bump",
    "dependency", "dependencies", "deps", "readme", "changelog", "ci", "pipeline", "tests",
    "unittest", "rename", "renamed", "chore", "docs", "license", "gitignore",
];

/// Hit counts for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordHits {
    /// Player-facing hits per bucket, in [`Bucket::ALL`] order.
    pub buckets: [usize; 5],
    /// Internal-signal keywords found.
    pub internal: Vec<String>,
}

impl KeywordHits {
    /// Total player-facing hits across all buckets.
    pub fn player_facing_total(&self) -> usize {
        self.buckets.iter().sum()
    }

    /// Bucket with the most hits; ties go to the earlier bucket.
    pub fn dominant(&self) -> Option<Bucket> {
        let mut best: Option<(Bucket, usize)> = None;
        for (bucket, &count) in Bucket::ALL.iter().zip(self.buckets.iter()) {
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((*bucket, count));
            }
        }
        best.map(|(bucket, _)| bucket)
    }
}

/// Splits text into lowercase alphanumeric words.
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Scans a message for whole-word keyword hits. Each distinct word counts once.
pub fn scan(message: &str) -> KeywordHits {
    let unique: HashSet<String> = words(message).collect();
    let mut hits = KeywordHits::default();

    for (slot, bucket) in hits.buckets.iter_mut().zip(Bucket::ALL) {
        *slot = bucket
            .keywords()
            .iter()
            .filter(|k| unique.contains(**k))
            .count();
    }

    let mut internal: Vec<String> = INTERNAL_KEYWORDS
        .iter()
        .filter(|k| unique.contains(**k))
        .map(ToString::to_string)
        .collect();
    internal.sort();
    hits.internal = internal;

    hits
}
