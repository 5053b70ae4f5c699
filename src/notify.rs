//! Approval drafts: the only output of a release run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::announce::Announcement;
use crate::banner::BannerAsset;
use crate::classify::{Classification, ClassifiedCommit};
use crate::classify::conventional::display_subject;
use crate::data::write_yaml_file;
use crate::git::short_hash;
use crate::resolve::{RejectedCandidate, ResolvedScreenshot};

/// File name of the draft description inside a draft directory.
pub const DRAFT_FILE_NAME: &str = "draft.yaml";
/// File name of the banner inside a draft directory.
pub const BANNER_FILE_NAME: &str = "banner.png";

/// Commit summary included in a draft.
#[derive(Debug, Clone, Serialize)]
pub struct DraftCommit {
    /// Abbreviated hash.
    pub hash: String,
    /// Subject without prefix or directives.
    pub subject: String,
    /// Classification.
    pub classification: Classification,
    /// Relevance, 0-100.
    pub relevance: u8,
    /// Whether the commit is breaking.
    pub breaking: bool,
}

impl From<&ClassifiedCommit> for DraftCommit {
    fn from(commit: &ClassifiedCommit) -> Self {
        Self {
            hash: short_hash(&commit.commit.hash).to_string(),
            subject: display_subject(&commit.commit.message),
            classification: commit.verdict.classification,
            relevance: commit.verdict.relevance,
            breaking: commit.verdict.breaking,
        }
    }
}

/// Everything a human needs to approve a release announcement.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseDraft {
    /// Release label, e.g. a tag name.
    pub label: String,
    /// Revision range the release covers.
    pub range: String,
    /// When the draft was produced.
    pub created: DateTime<Utc>,
    /// Announcement text.
    pub announcement: Announcement,
    /// Player-facing commits, most relevant first.
    pub commits: Vec<DraftCommit>,
    /// Screenshot the banner was built from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<ResolvedScreenshot>,
    /// Candidates passed over during resolution.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_screenshots: Vec<RejectedCandidate>,
    /// Banner metadata; the pixels are written separately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<BannerAsset>,
    /// Advisory warnings collected during the run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Where a submitted draft ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReceipt {
    /// Draft directory.
    pub directory: PathBuf,
    /// Banner file, when a banner was produced.
    pub banner: Option<PathBuf>,
}

/// Receives drafts for human approval.
pub trait ApprovalSink: Send + Sync {
    /// Hands a draft over for approval.
    fn submit(&self, draft: &ReleaseDraft) -> Result<DraftReceipt>;
}

/// Writes each draft to `<root>/<label>/`.
#[derive(Debug, Clone)]
pub struct DraftDirectorySink {
    root: PathBuf,
}

impl DraftDirectorySink {
    /// Creates a sink writing under `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory a draft with `label` is written to.
    pub fn draft_dir(&self, label: &str) -> PathBuf {
        self.root.join(sanitize_label(label))
    }
}

impl ApprovalSink for DraftDirectorySink {
    fn submit(&self, draft: &ReleaseDraft) -> Result<DraftReceipt> {
        let directory = self.draft_dir(&draft.label);
        std::fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create draft directory: {}", directory.display()))?;

        let banner_path = directory.join(BANNER_FILE_NAME);
        let banner = match &draft.banner {
            Some(asset) => {
                std::fs::write(&banner_path, &asset.bytes)
                    .with_context(|| format!("Failed to write banner: {}", banner_path.display()))?;
                Some(banner_path)
            }
            None => {
                // A stale banner from an earlier run must not be approved by mistake.
                if banner_path.exists() {
                    std::fs::remove_file(&banner_path).with_context(|| {
                        format!("Failed to remove stale banner: {}", banner_path.display())
                    })?;
                }
                None
            }
        };

        write_yaml_file(draft, directory.join(DRAFT_FILE_NAME))?;

        info!(
            directory = %directory.display(),
            has_banner = banner.is_some(),
            "Wrote release draft"
        );
        Ok(DraftReceipt { directory, banner })
    }
}

/// Turns a release label into a safe directory name.
pub fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');
    if cleaned.is_empty() {
        "release".to_string()
    } else {
        cleaned.to_string()
    }
}
