//! Git commit extraction

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use git2::{Commit, Repository};
use serde::{Deserialize, Serialize};

/// Commit information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full SHA-1 hash of the commit
    pub hash: String,
    /// Commit author name and email address
    pub author: String,
    /// Commit date in ISO format with timezone
    pub date: DateTime<FixedOffset>,
    /// The commit message as written by the author
    pub message: String,
    /// Paths touched by this commit relative to the repository root, in diff order
    pub changed_files: Vec<String>,
}

impl CommitInfo {
    /// Create CommitInfo from git2::Commit
    pub fn from_git_commit(repo: &Repository, commit: &Commit) -> Result<Self> {
        let hash = commit.id().to_string();

        let author = format!(
            "{} <{}>",
            commit.author().name().unwrap_or("Unknown"),
            commit.author().email().unwrap_or("unknown@example.com")
        );

        let timestamp = commit.author().when();
        let offset = FixedOffset::east_opt(timestamp.offset_minutes() * 60)
            .or_else(|| FixedOffset::east_opt(0))
            .context("Invalid commit timezone offset")?;
        let date = DateTime::from_timestamp(timestamp.seconds(), 0)
            .context("Invalid commit timestamp")?
            .with_timezone(&offset);

        let message = commit.message().unwrap_or("").to_string();
        let changed_files = Self::changed_files(repo, commit)?;

        Ok(Self {
            hash,
            author,
            date,
            message,
            changed_files,
        })
    }

    /// Returns the first line of the commit message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    /// Lists the paths changed between the commit and its first parent
    fn changed_files(repo: &Repository, commit: &Commit) -> Result<Vec<String>> {
        let commit_tree = commit.tree().context("Failed to get commit tree")?;

        let parent_tree = if commit.parent_count() > 0 {
            Some(
                commit
                    .parent(0)
                    .context("Failed to get parent commit")?
                    .tree()
                    .context("Failed to get parent tree")?,
            )
        } else {
            None
        };

        // Initial commit diffs against the empty tree
        let diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)
            .context("Failed to create diff")?;

        let mut files = Vec::new();
        diff.foreach(
            &mut |delta, _progress| {
                let file = delta.new_file().path().or_else(|| delta.old_file().path());
                if let Some(path_str) = file.and_then(|p| p.to_str()) {
                    files.push(path_str.to_string());
                }
                true
            },
            None,
            None,
            None,
        )
        .context("Failed to process diff")?;

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_is_first_trimmed_line() {
        let commit = CommitInfo {
            hash: "a".repeat(40),
            author: "Test <test@test.com>".to_string(),
            date: chrono::Utc::now().fixed_offset(),
            message: "feat: add dragon boss  \n\nLonger body here".to_string(),
            changed_files: Vec::new(),
        };
        assert_eq!(commit.subject(), "feat: add dragon boss");
    }
}
