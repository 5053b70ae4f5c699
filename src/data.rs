//! Data views and serialization.

use serde::Serialize;

use crate::classify::{Classification, ClassifiedCommit};
use crate::classify::conventional::display_subject;
use crate::git::short_hash;

pub mod yaml;

pub use yaml::*;

/// Classification report printed by `patchnote classify`.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationView {
    /// Version information for the tool.
    pub versions: VersionInfo,
    /// Revision range that was classified.
    pub range: String,
    /// Counts per classification.
    pub summary: ClassificationSummary,
    /// Classified commits, newest first.
    pub commits: Vec<CommitView>,
}

/// Version information.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Version of patchnote.
    pub patchnote: String,
}

/// Commit counts for a classified range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    /// Total commits in the range.
    pub total: usize,
    /// Commits that would be announced.
    pub player_facing: usize,
    /// Feature commits.
    pub feature: usize,
    /// Fix commits.
    pub fix: usize,
    /// Performance commits.
    pub performance: usize,
    /// Revert commits.
    pub revert: usize,
    /// Internal commits.
    pub internal: usize,
}

/// One classified commit.
#[derive(Debug, Clone, Serialize)]
pub struct CommitView {
    /// Abbreviated hash.
    pub hash: String,
    /// Author name and email.
    pub author: String,
    /// Commit date, RFC 3339.
    pub date: String,
    /// Subject without prefix or directives.
    pub subject: String,
    /// Classification.
    pub classification: Classification,
    /// Relevance, 0-100.
    pub relevance: u8,
    /// Whether the commit is breaking.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub breaking: bool,
    /// Evidence behind the classification.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<String>,
}

impl From<&ClassifiedCommit> for CommitView {
    fn from(classified: &ClassifiedCommit) -> Self {
        let commit = &classified.commit;
        Self {
            hash: short_hash(&commit.hash).to_string(),
            author: commit.author.clone(),
            date: commit.date.to_rfc3339(),
            subject: display_subject(&commit.message),
            classification: classified.verdict.classification,
            relevance: classified.verdict.relevance,
            breaking: classified.verdict.breaking,
            signals: classified.verdict.signals.clone(),
        }
    }
}

impl ClassificationView {
    /// Builds the report for `range`.
    pub fn new(range: &str, commits: &[ClassifiedCommit]) -> Self {
        let mut summary = ClassificationSummary {
            total: commits.len(),
            ..ClassificationSummary::default()
        };
        for commit in commits {
            let counter = match commit.verdict.classification {
                Classification::Feature => &mut summary.feature,
                Classification::Fix => &mut summary.fix,
                Classification::Performance => &mut summary.performance,
                Classification::Revert => &mut summary.revert,
                Classification::Internal => &mut summary.internal,
            };
            *counter += 1;
            if commit.is_player_facing() {
                summary.player_facing += 1;
            }
        }

        Self {
            versions: VersionInfo {
                patchnote: env!("CARGO_PKG_VERSION").to_string(),
            },
            range: range.to_string(),
            summary,
            commits: commits.iter().map(CommitView::from).collect(),
        }
    }
}
