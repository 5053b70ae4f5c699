//! CLI interface for patchnote.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::PressConfig;
use crate::git::GitRepository;
use crate::utils::check_git_repository;

pub mod banner;
pub mod classify;
pub mod config;
pub mod release;

/// patchnote: release announcements with screenshot banners, from commits.
#[derive(Parser)]
#[command(name = "patchnote")]
#[command(
    about = "Drafts release announcements with screenshot banners from game repository commits",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Options shared by every command.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Repository to read (default: current directory).
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<PathBuf>,
    /// Configuration file (default: <repo>/.patchnote.yaml).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    fn repo_path(&self) -> &Path {
        self.repo.as_deref().unwrap_or_else(|| Path::new("."))
    }

    /// Opens the repository, failing early outside a git work tree.
    pub fn open_repository(&self) -> Result<GitRepository> {
        check_git_repository(self.repo_path())
    }

    /// Loads configuration relative to the repository root.
    pub fn load_config(&self, repo: &GitRepository) -> Result<PressConfig> {
        PressConfig::load(repo.workdir()?, self.config.as_deref())
    }

    /// Repository work tree when there is one, otherwise the given path.
    pub fn project_root(&self) -> PathBuf {
        match GitRepository::open_at(self.repo_path()) {
            Ok(repo) => match repo.workdir() {
                Ok(dir) => dir.to_path_buf(),
                Err(_) => self.repo_path().to_path_buf(),
            },
            Err(_) => self.repo_path().to_path_buf(),
        }
    }
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Drafts one release announcement per revision range.
    Release(release::ReleaseCommand),
    /// Shows how commits in a range are classified, as YAML.
    Classify(classify::ClassifyCommand),
    /// Builds a banner from a single image file.
    Banner(banner::BannerCommand),
    /// Configuration inspection.
    Config(config::ConfigCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Release(cmd) => cmd.execute(&self.global).await,
            Commands::Classify(cmd) => cmd.execute(&self.global),
            Commands::Banner(cmd) => cmd.execute(&self.global),
            Commands::Config(cmd) => cmd.execute(&self.global),
        }
    }
}
