//! Release pipeline: one draft per revision range.
//!
//! Each release runs strictly in sequence: classify the commits, resolve a
//! screenshot, compose the banner, write the announcement and hand the draft
//! to the approval sink. Only a failure to read the commits or submit the
//! draft halts a release, and it halts only that release; everything else
//! degrades to warnings on the draft.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::announce::AnnouncementWriter;
use crate::banner::{BannerAsset, BannerCompositor};
use crate::classify::{ClassifiedCommit, Classifier};
use crate::config::PressConfig;
use crate::git::{short_hash, GitRepository};
use crate::notify::{ApprovalSink, DraftCommit, DraftReceipt, ReleaseDraft};
use crate::resolve::taxonomy::Taxonomy;
use crate::resolve::{ContentChecker, ResolvedScreenshot, ScreenshotResolver};

/// What happened to one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// A draft was submitted for approval.
    Drafted(DraftReceipt),
    /// The range has no player-facing commits.
    NothingToAnnounce,
    /// The run was cancelled before this release started.
    Cancelled,
    /// The release was halted; the run moved on to the next range.
    Failed(String),
}

/// Result of one release within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Revision range.
    pub range: String,
    /// Release label derived from the range.
    pub label: String,
    /// Outcome.
    pub outcome: ReleaseOutcome,
}

/// Per-run counters logged at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Drafts submitted.
    pub drafted: usize,
    /// Drafts submitted without a banner.
    pub without_banner: usize,
    /// Ranges with nothing to announce.
    pub skipped: usize,
    /// Ranges not started because of cancellation.
    pub cancelled: usize,
    /// Ranges whose release was halted by an error.
    pub failed: usize,
}

impl RunSummary {
    /// Tallies a list of reports.
    pub fn from_reports(reports: &[ReleaseReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match &report.outcome {
                ReleaseOutcome::Drafted(receipt) => {
                    summary.drafted += 1;
                    if receipt.banner.is_none() {
                        summary.without_banner += 1;
                    }
                }
                ReleaseOutcome::NothingToAnnounce => summary.skipped += 1,
                ReleaseOutcome::Cancelled => summary.cancelled += 1,
                ReleaseOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Sequences classifier, resolver and compositor for each release.
pub struct ReleasePipeline {
    repo: GitRepository,
    classifier: Classifier,
    resolver: ScreenshotResolver,
    compositor: Arc<BannerCompositor>,
    writer: AnnouncementWriter,
    sink: Box<dyn ApprovalSink>,
    cancel: Arc<AtomicBool>,
}

impl ReleasePipeline {
    /// Builds the pipeline from configuration.
    pub fn new(
        repo: GitRepository,
        config: &PressConfig,
        writer: AnnouncementWriter,
        sink: Box<dyn ApprovalSink>,
    ) -> Result<Self> {
        let workdir = repo.workdir()?.to_path_buf();
        let classifier = Classifier::new(&config.classifier)?;
        let resolver = ScreenshotResolver::new(&config.resolver, Taxonomy::new(&config.taxonomy))?;
        let compositor = Arc::new(BannerCompositor::from_config(config, &workdir));

        Ok(Self {
            repo,
            classifier,
            resolver,
            compositor,
            writer,
            sink,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Attaches a deep content checker to the resolver.
    pub fn with_checker(mut self, checker: Box<dyn ContentChecker>) -> Self {
        self.resolver = self.resolver.with_checker(checker);
        self
    }

    /// Flag that stops the run before the next release starts.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Runs one release per range, in order. A release that fails is
    /// reported as [`ReleaseOutcome::Failed`] and the run continues.
    pub async fn run(&self, ranges: &[String]) -> Result<Vec<ReleaseReport>> {
        let mut reports = Vec::with_capacity(ranges.len());
        for range in ranges {
            if self.cancel.load(Ordering::SeqCst) {
                warn!(range = %range, "Run cancelled, skipping release");
                reports.push(ReleaseReport {
                    range: range.clone(),
                    label: release_label(range, None),
                    outcome: ReleaseOutcome::Cancelled,
                });
                continue;
            }
            let report = match self.run_release(range).await {
                Ok(report) => report,
                Err(e) => {
                    let message = format!("{e:#}");
                    warn!(range = %range, error = %message, "Release failed, continuing with the next range");
                    ReleaseReport {
                        range: range.clone(),
                        label: release_label(range, None),
                        outcome: ReleaseOutcome::Failed(message),
                    }
                }
            };
            reports.push(report);
        }

        let summary = RunSummary::from_reports(&reports);
        info!(
            drafted = summary.drafted,
            without_banner = summary.without_banner,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            failed = summary.failed,
            "Release run finished"
        );
        Ok(reports)
    }

    /// Produces and submits the draft for a single range.
    pub async fn run_release(&self, range: &str) -> Result<ReleaseReport> {
        let commits = self
            .repo
            .get_commits_in_range(range)
            .with_context(|| format!("Failed to read commits for release {range}"))?;
        let label = release_label(range, commits.last().map(|c| c.hash.as_str()));

        let mut player_facing: Vec<ClassifiedCommit> = self
            .classifier
            .classify_all(&commits)
            .into_iter()
            .filter(ClassifiedCommit::is_player_facing)
            .collect();
        info!(
            range = %range,
            total = commits.len(),
            player_facing = player_facing.len(),
            "Classified release commits"
        );
        if player_facing.is_empty() {
            return Ok(ReleaseReport {
                range: range.to_string(),
                label,
                outcome: ReleaseOutcome::NothingToAnnounce,
            });
        }

        let mut warnings = Vec::new();
        let images = match self.repo.tracked_images() {
            Ok(images) => images,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to list tracked images");
                warnings.push(format!("Could not list tracked images: {e:#}"));
                Vec::new()
            }
        };

        let resolution = self.resolver.resolve(&player_facing, &images).await;
        warnings.extend(resolution.warnings);

        let banner = match &resolution.selected {
            Some(shot) => self.compose_banner(shot, &mut warnings).await,
            None => {
                warnings.push("No suitable screenshot found; the draft has no banner".to_string());
                None
            }
        };

        let announcement = self.writer.write(&label, &player_facing).await;

        // Stable: equal relevance keeps commit order.
        player_facing.sort_by(|a, b| b.verdict.relevance.cmp(&a.verdict.relevance));

        let draft = ReleaseDraft {
            label: label.clone(),
            range: range.to_string(),
            created: Utc::now(),
            announcement,
            commits: player_facing.iter().map(DraftCommit::from).collect(),
            screenshot: resolution.selected,
            rejected_screenshots: resolution.rejected,
            banner,
            warnings,
        };

        let receipt = self
            .sink
            .submit(&draft)
            .with_context(|| format!("Failed to submit draft for release {label}"))?;

        Ok(ReleaseReport {
            range: range.to_string(),
            label,
            outcome: ReleaseOutcome::Drafted(receipt),
        })
    }

    async fn compose_banner(
        &self,
        shot: &ResolvedScreenshot,
        warnings: &mut Vec<String>,
    ) -> Option<BannerAsset> {
        let path = &shot.candidate.path;
        let bytes = match std::fs::read(&shot.candidate.location) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to read screenshot");
                warnings.push(format!("Could not read {path}: {e}; the draft has no banner"));
                return None;
            }
        };

        // Resizing and the external upscaler are blocking work.
        let compositor = Arc::clone(&self.compositor);
        let composed = match tokio::task::spawn_blocking(move || compositor.compose(&bytes)).await {
            Ok(composed) => composed,
            Err(e) => {
                warn!(path = %path, error = %e, "Banner task did not complete");
                warnings.push(format!("Could not build a banner from {path}: {e}"));
                return None;
            }
        };

        match composed {
            Ok(asset) => {
                debug!(
                    path = %path,
                    tier = %asset.tier,
                    quality = asset.quality,
                    "Composed banner"
                );
                if asset.quality < 50 {
                    warnings.push(format!(
                        "Banner from {path} has low quality ({}/100, upscaled {:.1}x)",
                        asset.quality, asset.scale_factor
                    ));
                }
                Some(asset)
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Banner composition failed");
                warnings.push(format!("Could not build a banner from {path}: {e}"));
                None
            }
        }
    }
}

/// Release label for a range: its end revision, or the newest commit's
/// short hash when the range ends at `HEAD`.
pub fn release_label(range: &str, newest_commit: Option<&str>) -> String {
    let end = match range.split_once("..") {
        Some((_, end)) => end.trim_start_matches('.'),
        None => range,
    };
    if !end.is_empty() && end != "HEAD" {
        return end.to_string();
    }
    match newest_commit {
        Some(hash) => short_hash(hash).to_string(),
        None => "HEAD".to_string(),
    }
}
