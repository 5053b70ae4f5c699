//! Preflight checks run before any expensive work.

use std::path::Path;

use anyhow::{Context, Result};

use crate::ai::API_KEY_VARS;
use crate::git::GitRepository;
use crate::utils::settings::get_env_vars;

/// Fails early when `path` is not inside a git repository with a work tree.
pub fn check_git_repository(path: &Path) -> Result<GitRepository> {
    let repo = GitRepository::open_at(path).with_context(|| {
        format!(
            "Not in a git repository: {}. Run patchnote from within the game repository or pass --repo.",
            path.display()
        )
    })?;
    repo.workdir()
        .context("patchnote needs a repository with a working tree, not a bare repository")?;
    Ok(repo)
}

/// Whether Claude credentials are available, from the environment or the
/// settings file.
pub fn check_ai_credentials() -> bool {
    get_env_vars(API_KEY_VARS).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rejects_plain_directory() {
        let dir = TempDir::new().unwrap();
        let err = check_git_repository(dir.path()).err().unwrap();
        assert!(err.to_string().contains("Not in a git repository"));
    }

    #[test]
    fn accepts_repository() {
        let dir = TempDir::new().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        assert!(check_git_repository(dir.path()).is_ok());
    }

    #[test]
    fn rejects_bare_repository() {
        let dir = TempDir::new().unwrap();
        git2::Repository::init_bare(dir.path()).unwrap();
        assert!(check_git_repository(dir.path()).is_err());
    }
}
