//! Commit classification: player-facing versus internal.
//!
//! Classification is a pure function of the commit message and its changed
//! paths. A declared conventional type is authoritative; otherwise keyword
//! buckets and content paths decide, and a commit with no signal at all is
//! internal.

pub mod conventional;
pub mod keywords;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClassifierConfig;
use crate::git::CommitInfo;
use conventional::{parse_header, CommitType};
use keywords::Bucket;

/// Announcement-level classification of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// New or changed player-visible functionality or content.
    Feature,
    /// Player-visible bug fix.
    Fix,
    /// Player-visible performance improvement.
    Performance,
    /// Revert of an earlier change.
    Revert,
    /// Tooling, process or maintenance; never announced.
    Internal,
}

impl Classification {
    /// Whether commits of this class belong in an announcement.
    pub fn is_player_facing(self) -> bool {
        self != Self::Internal
    }
}

/// Outcome of classifying one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Resulting classification.
    pub classification: Classification,
    /// Relevance to players, 0-100.
    pub relevance: u8,
    /// Whether the commit declares a breaking change.
    pub breaking: bool,
    /// Evidence that produced the verdict.
    pub signals: Vec<String>,
}

impl Verdict {
    /// Whether the verdict is player-facing.
    pub fn is_player_facing(&self) -> bool {
        self.classification.is_player_facing()
    }
}

/// A commit together with its verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedCommit {
    /// The underlying commit.
    pub commit: CommitInfo,
    /// Classification result.
    pub verdict: Verdict,
}

impl ClassifiedCommit {
    /// Whether this commit belongs in an announcement.
    pub fn is_player_facing(&self) -> bool {
        self.verdict.is_player_facing()
    }
}

const BASE_FEATURE: u8 = 60;
const BASE_FIX: u8 = 45;
const BASE_PERFORMANCE: u8 = 40;
const BASE_REVERT: u8 = 30;
const BASE_INTERNAL_SIGNAL: u8 = 5;
const DECLARED_TYPE_BONUS: u8 = 10;
const BREAKING_BONUS: u8 = 15;
const KEYWORD_BONUS: u8 = 5;
const KEYWORD_BONUS_CAP: u8 = 15;
const CONTENT_PATH_BONUS: u8 = 10;

/// Commit classifier with compiled path globs.
pub struct Classifier {
    content: GlobSet,
    ignored: GlobSet,
}

impl Classifier {
    /// Builds a classifier from configuration.
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        Ok(Self {
            content: build_globset(&config.content_globs)
                .context("Invalid classifier content_globs")?,
            ignored: build_globset(&config.ignored_globs)
                .context("Invalid classifier ignored_globs")?,
        })
    }

    /// Classifies a commit message and its changed paths.
    pub fn classify(&self, message: &str, changed_files: &[String]) -> Verdict {
        let content_paths: Vec<&str> = changed_files
            .iter()
            .map(String::as_str)
            .filter(|path| self.is_content_path(path))
            .collect();

        if let Some(header) = parse_header(message) {
            return declared_verdict(header.commit_type, header.breaking, &content_paths);
        }

        let hits = keywords::scan(message);
        let mut signals = Vec::new();
        let player_hits = hits.player_facing_total().min(usize::from(u8::MAX)) as u8;

        let mut classification = if !hits.internal.is_empty() {
            signals.push(format!("internal keywords: {}", hits.internal.join(", ")));
            Classification::Internal
        } else if let Some(bucket) = hits.dominant() {
            signals.push(format!("keyword bucket: {bucket:?}"));
            bucket_classification(bucket)
        } else {
            Classification::Internal
        };

        let upgraded = !content_paths.is_empty() && classification == Classification::Internal;
        if !content_paths.is_empty() {
            signals.push(format!("content paths: {}", content_paths.join(", ")));
            if upgraded {
                classification = Classification::Feature;
            }
        }

        let relevance = if classification == Classification::Internal {
            if signals.is_empty() {
                0
            } else {
                BASE_INTERNAL_SIGNAL
            }
        } else {
            let keyword_bonus = player_hits
                .saturating_mul(KEYWORD_BONUS)
                .min(KEYWORD_BONUS_CAP);
            let path_bonus = if content_paths.is_empty() {
                0
            } else {
                CONTENT_PATH_BONUS
            };
            base_relevance(classification)
                .saturating_add(keyword_bonus)
                .saturating_add(path_bonus)
                .min(100)
        };

        debug!(
            ?classification,
            relevance,
            upgraded,
            "Classified free-form commit"
        );

        Verdict {
            classification,
            relevance,
            breaking: false,
            signals,
        }
    }

    /// Classifies a repository commit.
    pub fn classify_commit(&self, commit: &CommitInfo) -> ClassifiedCommit {
        ClassifiedCommit {
            commit: commit.clone(),
            verdict: self.classify(&commit.message, &commit.changed_files),
        }
    }

    /// Classifies every commit.
    pub fn classify_all(&self, commits: &[CommitInfo]) -> Vec<ClassifiedCommit> {
        commits.iter().map(|c| self.classify_commit(c)).collect()
    }

    /// Returns only the player-facing commits, in input order.
    pub fn player_facing(&self, commits: &[CommitInfo]) -> Vec<ClassifiedCommit> {
        self.classify_all(commits)
            .into_iter()
            .filter(ClassifiedCommit::is_player_facing)
            .collect()
    }

    fn is_content_path(&self, path: &str) -> bool {
        self.content.is_match(path) && !self.ignored.is_match(path)
    }
}

/// Compiles a list of glob patterns.
pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {pattern}"))?);
    }
    builder.build().context("Failed to build glob set")
}

fn declared_verdict(commit_type: CommitType, breaking: bool, content_paths: &[&str]) -> Verdict {
    let classification = match commit_type {
        CommitType::Feat => Classification::Feature,
        CommitType::Fix => Classification::Fix,
        CommitType::Perf => Classification::Performance,
        CommitType::Revert => Classification::Revert,
        CommitType::Chore
        | CommitType::Docs
        | CommitType::Style
        | CommitType::Refactor
        | CommitType::Test
        | CommitType::Build
        | CommitType::Ci => Classification::Internal,
    };

    let mut signals = vec![format!("conventional type: {}", commit_type.as_str())];
    if breaking {
        signals.push("breaking change".to_string());
    }

    let relevance = if classification == Classification::Internal {
        BASE_INTERNAL_SIGNAL
    } else {
        let mut score = base_relevance(classification).saturating_add(DECLARED_TYPE_BONUS);
        if breaking {
            score = score.saturating_add(BREAKING_BONUS);
        }
        if !content_paths.is_empty() {
            signals.push(format!("content paths: {}", content_paths.join(", ")));
            score = score.saturating_add(CONTENT_PATH_BONUS);
        }
        score.min(100)
    };

    Verdict {
        classification,
        relevance,
        breaking,
        signals,
    }
}

fn bucket_classification(bucket: Bucket) -> Classification {
    match bucket {
        Bucket::Gameplay | Bucket::Content | Bucket::Balance => Classification::Feature,
        Bucket::BugFix => Classification::Fix,
        Bucket::Performance => Classification::Performance,
    }
}

fn base_relevance(classification: Classification) -> u8 {
    match classification {
        Classification::Feature => BASE_FEATURE,
        Classification::Fix => BASE_FIX,
        Classification::Performance => BASE_PERFORMANCE,
        Classification::Revert => BASE_REVERT,
        Classification::Internal => 0,
    }
}
