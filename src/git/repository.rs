//! Git repository operations

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use git2::{Oid, Repository, Sort};
use serde::Serialize;
use tracing::debug;

use crate::git::{is_image_path, CommitInfo};

/// Git repository wrapper
pub struct GitRepository {
    repo: Repository,
}

/// Tracked image file present in the working tree
#[derive(Debug, Clone, Serialize)]
pub struct ImageFile {
    /// Path relative to the repository root, with `/` separators
    pub path: String,
    /// Absolute location on disk
    pub location: PathBuf,
    /// Time of the last commit touching the file, or its file modification
    /// time when no commit has touched it yet
    pub modified: DateTime<Utc>,
    /// File size in bytes
    pub size: u64,
}

impl GitRepository {
    /// Open repository at current directory
    pub fn open() -> Result<Self> {
        let repo = Repository::discover(".").context("Not in a git repository")?;

        Ok(Self { repo })
    }

    /// Open repository at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path).context("Failed to open git repository")?;

        Ok(Self { repo })
    }

    /// Get workdir path
    pub fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .context("Repository has no working directory (bare repositories are not supported)")
    }

    /// Get access to the underlying git2::Repository
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Finds the most recent tag whose commit is reachable from HEAD.
    pub fn latest_tag(&self) -> Result<Option<String>> {
        let head = self
            .repo
            .head()
            .context("Failed to get HEAD reference")?
            .peel_to_commit()
            .context("Failed to peel HEAD to commit")?;

        let names = self.repo.tag_names(None).context("Failed to list tags")?;
        let mut best: Option<(i64, String)> = None;

        for name in names.iter().flatten() {
            let Ok(object) = self.repo.revparse_single(name) else {
                continue;
            };
            let Ok(commit) = object.peel_to_commit() else {
                continue;
            };

            let reachable = commit.id() == head.id()
                || self
                    .repo
                    .graph_descendant_of(head.id(), commit.id())
                    .unwrap_or(false);
            if !reachable {
                continue;
            }

            let when = commit.time().seconds();
            if best.as_ref().map_or(true, |(t, _)| when > *t) {
                best = Some((when, name.to_string()));
            }
        }

        Ok(best.map(|(_, name)| name))
    }

    /// Returns the default release range: everything since the latest tag,
    /// or the whole history when the repository has no reachable tag.
    pub fn default_release_range(&self) -> Result<String> {
        Ok(match self.latest_tag()? {
            Some(tag) => format!("{tag}..HEAD"),
            None => "..HEAD".to_string(),
        })
    }

    /// Parse commit range and get commits, oldest first.
    ///
    /// Accepts `A..B`, `..B` (all history reachable from `B`), or a single
    /// revision. Merge commits are skipped.
    pub fn get_commits_in_range(&self, range: &str) -> Result<Vec<CommitInfo>> {
        let mut walker = self.repo.revwalk().context("Failed to create revwalk")?;
        walker
            .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .context("Failed to configure revwalk")?;

        if let Some((start_spec, end_spec)) = range.split_once("..") {
            let end_spec = if end_spec.is_empty() { "HEAD" } else { end_spec };
            let end_id = self.resolve_commit(end_spec)?;
            walker
                .push(end_id)
                .context("Failed to push end commit")?;

            if !start_spec.is_empty() {
                let start_id = self.resolve_commit(start_spec)?;
                walker
                    .hide(start_id)
                    .context("Failed to hide start commit")?;
            }
        } else {
            let id = self.resolve_commit(range)?;
            let commit = self.repo.find_commit(id).context("Failed to find commit")?;
            return Ok(vec![CommitInfo::from_git_commit(&self.repo, &commit)?]);
        }

        let mut commits = Vec::new();
        for oid in walker {
            let oid = oid.context("Failed to get commit OID from walker")?;
            let commit = self
                .repo
                .find_commit(oid)
                .context("Failed to find commit")?;

            // Skip merge commits
            if commit.parent_count() > 1 {
                continue;
            }

            commits.push(CommitInfo::from_git_commit(&self.repo, &commit)?);
        }

        // Reverse to get chronological order (oldest first)
        commits.reverse();
        debug!(range = %range, count = commits.len(), "Collected commits");

        Ok(commits)
    }

    /// Lists tracked image files that still exist in the working tree.
    ///
    /// Working-tree mtimes are meaningless in a fresh checkout, so each file
    /// is dated by the last commit that touched it.
    pub fn tracked_images(&self) -> Result<Vec<ImageFile>> {
        let workdir = self.workdir()?.to_path_buf();
        let index = self.repo.index().context("Failed to read repository index")?;

        let paths: Vec<String> = index
            .iter()
            .filter_map(|entry| String::from_utf8(entry.path).ok())
            .filter(|path| is_image_path(path))
            .collect();
        let committed = self.last_commit_times(&paths)?;

        let mut images = Vec::new();
        for entry in index.iter() {
            let Ok(path) = std::str::from_utf8(&entry.path) else {
                continue;
            };
            if !is_image_path(path) {
                continue;
            }

            let location = workdir.join(path);
            let Ok(metadata) = std::fs::metadata(&location) else {
                debug!(path = %path, "Tracked image missing from working tree");
                continue;
            };

            let modified = committed
                .get(path)
                .copied()
                .or_else(|| metadata.modified().map(DateTime::<Utc>::from).ok())
                .or_else(|| DateTime::from_timestamp(i64::from(entry.mtime.seconds()), 0))
                .unwrap_or_default();

            images.push(ImageFile {
                path: path.to_string(),
                location,
                modified,
                size: metadata.len(),
            });
        }

        debug!(count = images.len(), "Listed tracked images");
        Ok(images)
    }

    /// Walks history from `HEAD`, newest first, recording the commit time of
    /// the first commit that changed each of `paths`.
    fn last_commit_times(&self, paths: &[String]) -> Result<HashMap<String, DateTime<Utc>>> {
        let mut times = HashMap::new();
        if paths.is_empty() || self.repo.head().is_err() {
            return Ok(times);
        }

        let mut walker = self.repo.revwalk().context("Failed to create revwalk")?;
        walker
            .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .context("Failed to configure revwalk")?;
        walker.push_head().context("Failed to push HEAD")?;

        for oid in walker {
            let oid = oid.context("Failed to get commit OID from walker")?;
            let commit = self
                .repo
                .find_commit(oid)
                .context("Failed to find commit")?;
            let tree = commit.tree().context("Failed to get commit tree")?;
            let parent_tree = match commit.parent(0) {
                Ok(parent) => Some(parent.tree().context("Failed to get parent tree")?),
                Err(_) => None,
            };
            let diff = self
                .repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
                .context("Failed to diff commit")?;

            let when = DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default();
            for delta in diff.deltas() {
                let Some(path) = delta.new_file().path().and_then(Path::to_str) else {
                    continue;
                };
                if !times.contains_key(path) && paths.iter().any(|p| p == path) {
                    times.insert(path.to_string(), when);
                }
            }

            if times.len() == paths.len() {
                break;
            }
        }

        Ok(times)
    }

    fn resolve_commit(&self, spec: &str) -> Result<Oid> {
        let object = self
            .repo
            .revparse_single(spec)
            .with_context(|| format!("Failed to parse commit: {spec}"))?;
        let commit = object
            .peel_to_commit()
            .with_context(|| format!("Failed to peel {spec} to commit"))?;
        Ok(commit.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use tempfile::TempDir;

    fn commit(repo: &Repository, files: &[(&str, &[u8])], message: &str) -> Oid {
        let workdir = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();
        for (path, bytes) in files {
            let location = workdir.join(path);
            std::fs::create_dir_all(location.parent().unwrap()).unwrap();
            std::fs::write(&location, bytes).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Dev", "dev@example.com").unwrap();
        let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    fn scratch() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    // ── ranges ──────────────────────────────────────────────────────

    #[test]
    fn commits_are_oldest_first_with_changed_files() {
        let (dir, repo) = scratch();
        commit(&repo, &[("src/main.rs", b"fn main() {}")], "chore: init");
        commit(&repo, &[("art/dragon.png", b"png")], "feat: add dragon art");
        commit(&repo, &[("src/boss.rs", b"")], "feat: add boss");

        let git = GitRepository::open_at(dir.path()).unwrap();
        let commits = git.get_commits_in_range("HEAD~2..HEAD").unwrap();
        let subjects: Vec<&str> = commits.iter().map(CommitInfo::subject).collect();
        assert_eq!(subjects, ["feat: add dragon art", "feat: add boss"]);
        assert_eq!(commits[0].changed_files, ["art/dragon.png"]);

        assert_eq!(git.get_commits_in_range("..HEAD").unwrap().len(), 3);
        assert_eq!(git.get_commits_in_range("HEAD").unwrap().len(), 1);
    }

    #[test]
    fn unknown_revision_is_an_error() {
        let (dir, repo) = scratch();
        commit(&repo, &[("a.txt", b"a")], "chore: init");
        let git = GitRepository::open_at(dir.path()).unwrap();
        let err = git.get_commits_in_range("nope..HEAD").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn default_range_starts_at_latest_reachable_tag() {
        let (dir, repo) = scratch();
        let git = GitRepository::open_at(dir.path()).unwrap();

        commit(&repo, &[("a.txt", b"a")], "chore: init");
        assert_eq!(git.default_release_range().unwrap(), "..HEAD");

        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.tag_lightweight("v0.1.0", head.as_object(), false)
            .unwrap();
        commit(&repo, &[("b.txt", b"b")], "feat: add b");

        assert_eq!(git.latest_tag().unwrap().as_deref(), Some("v0.1.0"));
        assert_eq!(git.default_release_range().unwrap(), "v0.1.0..HEAD");
        assert_eq!(git.get_commits_in_range("v0.1.0..HEAD").unwrap().len(), 1);
    }

    // ── images ──────────────────────────────────────────────────────

    #[test]
    fn tracked_images_skip_untracked_and_deleted_files() {
        let (dir, repo) = scratch();
        commit(
            &repo,
            &[
                ("promo/title.png", b"12345"),
                ("promo/gone.jpg", b"x"),
                ("src/lib.rs", b""),
            ],
            "chore: add files",
        );
        std::fs::remove_file(dir.path().join("promo/gone.jpg")).unwrap();
        std::fs::write(dir.path().join("untracked.png"), b"x").unwrap();

        let git = GitRepository::open_at(dir.path()).unwrap();
        let images = git.tracked_images().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].path, "promo/title.png");
        assert_eq!(images[0].size, 5);
        assert!(images[0].location.ends_with("promo/title.png"));
    }

    #[test]
    fn tracked_images_are_dated_by_last_commit() {
        let (dir, repo) = scratch();
        let at = |secs: i64| Signature::new("Dev", "dev@example.com", &git2::Time::new(secs, 0)).unwrap();

        let commit_at = |files: &[(&str, &[u8])], message: &str, secs: i64| {
            let mut index = repo.index().unwrap();
            for (path, bytes) in files {
                std::fs::create_dir_all(dir.path().join(path).parent().unwrap()).unwrap();
                std::fs::write(dir.path().join(path), bytes).unwrap();
                index.add_path(Path::new(path)).unwrap();
            }
            index.write().unwrap();
            let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
            let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
            let parents: Vec<&git2::Commit> = parent.iter().collect();
            let sig = at(secs);
            repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
                .unwrap();
        };

        commit_at(&[("art/old.png", b"old")], "chore: old art", 1_600_000_000);
        commit_at(&[("art/new.png", b"new")], "chore: new art", 1_700_000_000);
        // Same mtime for both files on disk, as after a fresh clone.
        std::fs::write(dir.path().join("art/new.png"), b"new").unwrap();
        std::fs::write(dir.path().join("art/old.png"), b"old").unwrap();

        // Staged but never committed: falls back to the file time.
        std::fs::write(dir.path().join("art/staged.png"), b"staged").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("art/staged.png")).unwrap();
        index.write().unwrap();

        let git = GitRepository::open_at(dir.path()).unwrap();
        let images = git.tracked_images().unwrap();
        let modified = |path: &str| images.iter().find(|i| i.path == path).unwrap().modified;

        assert_eq!(modified("art/old.png").timestamp(), 1_600_000_000);
        assert_eq!(modified("art/new.png").timestamp(), 1_700_000_000);
        assert!(modified("art/staged.png").timestamp() > 1_700_000_000);
    }
}
