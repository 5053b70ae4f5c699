//! Release command: drafts announcements for human approval.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use super::GlobalArgs;
use crate::ai::{create_claude_client, AiClient, ClaudeAiClient, ClaudeVisionChecker};
use crate::announce::AnnouncementWriter;
use crate::config::PressConfig;
use crate::notify::DraftDirectorySink;
use crate::pipeline::{ReleaseOutcome, ReleasePipeline, RunSummary};
use crate::utils::check_ai_credentials;

/// Release command options.
#[derive(Parser)]
pub struct ReleaseCommand {
    /// Revision ranges, one release each (default: <latest tag>..HEAD).
    #[arg(value_name = "RANGE")]
    pub ranges: Vec<String>,
    /// Draft directory (default: drafts_dir from the configuration).
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<PathBuf>,
    /// Skips every AI call; announcements use the built-in fallback.
    #[arg(long)]
    pub no_ai: bool,
    /// File with background text about the game.
    #[arg(long, value_name = "FILE")]
    pub game_context: Option<PathBuf>,
    /// Claude model to use instead of the configured one.
    #[arg(long)]
    pub model: Option<String>,
}

impl ReleaseCommand {
    /// Executes the release command.
    pub async fn execute(self, global: &GlobalArgs) -> Result<()> {
        let repo = global.open_repository()?;
        let config = global.load_config(&repo)?;
        let workdir = repo.workdir()?.to_path_buf();

        let ranges = if self.ranges.is_empty() {
            vec![repo.default_release_range()?]
        } else {
            self.ranges.clone()
        };
        let output = match &self.output {
            Some(dir) => dir.clone(),
            None => PressConfig::resolve_path(&workdir, &config.drafts_dir),
        };

        let game_context = self.read_game_context(&config, &workdir)?;
        let client = if self.no_ai {
            None
        } else {
            self.ai_client(&config)?
        };

        let writer = AnnouncementWriter::new(
            client
                .clone()
                .map(|c| Box::new(c) as Box<dyn AiClient>),
        )
        .with_game_context(game_context);

        let mut pipeline = ReleasePipeline::new(
            repo,
            &config,
            writer,
            Box::new(DraftDirectorySink::new(&output)),
        )?;
        if config.resolver.deep_check.enabled {
            match client {
                Some(client) => {
                    pipeline = pipeline.with_checker(Box::new(ClaudeVisionChecker::new(client)));
                }
                None => info!("Deep check enabled but no AI client; inconclusive screenshots stay uncertain"),
            }
        }

        let cancel = pipeline.cancel_flag();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted: finishing the current release, skipping the rest");
                cancel.store(true, Ordering::SeqCst);
            }
        });

        let reports = pipeline.run(&ranges).await?;
        for report in &reports {
            match &report.outcome {
                ReleaseOutcome::Drafted(receipt) => {
                    println!("✅ {}: draft in {}", report.label, receipt.directory.display());
                    if receipt.banner.is_none() {
                        println!("   (no banner)");
                    }
                }
                ReleaseOutcome::NothingToAnnounce => {
                    println!("➖ {}: no player-facing changes in {}", report.label, report.range);
                }
                ReleaseOutcome::Cancelled => {
                    println!("⏹  {}: skipped after interrupt", report.range);
                }
                ReleaseOutcome::Failed(message) => {
                    println!("❌ {}: {message}", report.range);
                }
            }
        }

        let summary = RunSummary::from_reports(&reports);
        if summary.drafted > 0 {
            println!("\nReview and approve the drafts in {}", output.display());
        }
        if summary.failed > 0 {
            anyhow::bail!("{} of {} releases failed", summary.failed, reports.len());
        }
        Ok(())
    }

    fn read_game_context(&self, config: &PressConfig, workdir: &Path) -> Result<Option<String>> {
        let path = match (&self.game_context, &config.ai.game_context) {
            (Some(path), _) => path.clone(),
            (None, Some(path)) => PressConfig::resolve_path(workdir, path),
            (None, None) => return Ok(None),
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read game context: {}", path.display()))?;
        Ok(Some(text.trim().to_string()).filter(|t| !t.is_empty()))
    }

    fn ai_client(&self, config: &PressConfig) -> Result<Option<ClaudeAiClient>> {
        if !check_ai_credentials() {
            warn!("No Claude API key found, announcements use the built-in fallback");
            return Ok(None);
        }
        create_claude_client(&config.ai, self.model.as_deref()).map(Some)
    }
}
