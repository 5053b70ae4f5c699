//! Screenshot resolution for a release.
//!
//! Candidates are tried in priority order: an explicit directive in a commit
//! message, images changed by the release's commits, then the newest image
//! in a promotional folder. Directive hits are authoritative; everything else
//! goes through keyword, structural and (optionally) deep content checks.

pub mod deep_check;
pub mod directive;
pub mod taxonomy;
pub mod validation;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use globset::GlobSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classify::{build_globset, ClassifiedCommit};
use crate::config::ResolverConfig;
use crate::git::{is_image_path, short_hash, ImageFile};
pub use deep_check::{ContentChecker, DeepCheckOutcome};
use directive::{directive_paths, normalize_path, strip_directives};
use taxonomy::{path_keywords, text_keywords, Taxonomy};
pub use validation::MatchConfidence;

/// Where a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginTier {
    /// Named by a `[shot: ...]` directive.
    ExplicitDirective,
    /// Changed by one of the release's commits.
    CoLocated,
    /// Newest image in a promotional folder.
    RepositoryFallback,
}

/// Candidate image for a release banner.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenshotCandidate {
    /// Repository-relative path.
    pub path: String,
    /// Location on disk; bytes are only read for the chosen candidate.
    pub location: PathBuf,
    /// Priority tier that produced the candidate.
    pub origin: OriginTier,
    /// Normalized tokens from the file name and directories.
    pub keywords: BTreeSet<String>,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// File size in bytes.
    pub size: u64,
}

impl ScreenshotCandidate {
    fn from_image(image: &ImageFile, origin: OriginTier) -> Self {
        Self {
            path: image.path.clone(),
            location: image.location.clone(),
            origin,
            keywords: path_keywords(&image.path),
            modified: image.modified,
            size: image.size,
        }
    }
}

/// The selected candidate and how confident the resolver is in it.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedScreenshot {
    /// Selected candidate.
    pub candidate: ScreenshotCandidate,
    /// `None` for explicit directives, which skip validation.
    pub confidence: Option<MatchConfidence>,
}

/// A candidate that failed validation.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedCandidate {
    /// Repository-relative path.
    pub path: String,
    /// Tier the candidate came from.
    pub origin: OriginTier,
    /// Why it was passed over.
    pub reason: String,
}

/// Outcome of resolving one release.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    /// Chosen screenshot, if any.
    pub selected: Option<ResolvedScreenshot>,
    /// Advisory warnings for the approver.
    pub warnings: Vec<String>,
    /// Candidates tried and passed over, in order.
    pub rejected: Vec<RejectedCandidate>,
}

enum Validation {
    Accepted {
        confidence: MatchConfidence,
        warnings: Vec<String>,
    },
    Rejected(String),
}

/// Resolves the best screenshot for a set of classified commits.
pub struct ScreenshotResolver {
    config: ResolverConfig,
    taxonomy: Taxonomy,
    promotional: GlobSet,
    checker: Option<Box<dyn ContentChecker>>,
}

impl ScreenshotResolver {
    /// Creates a resolver without a deep content checker.
    pub fn new(config: &ResolverConfig, taxonomy: Taxonomy) -> Result<Self> {
        let promotional = build_globset(&config.promotional_globs)
            .context("Invalid resolver promotional_globs")?;

        Ok(Self {
            config: config.clone(),
            taxonomy,
            promotional,
            checker: None,
        })
    }

    /// Attaches a deep content checker for inconclusive candidates.
    pub fn with_checker(mut self, checker: Box<dyn ContentChecker>) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Picks at most one screenshot for the player-facing commits.
    ///
    /// Never fails: unreadable files and checker failures degrade to a lower
    /// confidence or to the next candidate.
    pub async fn resolve(&self, commits: &[ClassifiedCommit], images: &[ImageFile]) -> Resolution {
        let mut resolution = Resolution::default();

        let player_facing: Vec<&ClassifiedCommit> =
            commits.iter().filter(|c| c.is_player_facing()).collect();
        if player_facing.is_empty() {
            debug!("No player-facing commits, skipping screenshot resolution");
            return resolution;
        }
        if images.is_empty() {
            info!("Repository has no tracked images, release gets no banner");
            return resolution;
        }

        let listing: HashMap<&str, &ImageFile> =
            images.iter().map(|i| (i.path.as_str(), i)).collect();

        if let Some(resolved) = self.from_directives(&player_facing, &listing, &mut resolution) {
            resolution.selected = Some(resolved);
            return resolution;
        }

        let commit_text = player_facing
            .iter()
            .map(|c| strip_directives(&c.commit.message))
            .collect::<Vec<_>>()
            .join("\n");
        let commit_keywords = text_keywords(&commit_text);

        let mut tried: HashSet<String> = HashSet::new();
        let candidates = self
            .co_located(&player_facing, &listing)
            .into_iter()
            .chain(self.fallback(images));

        for candidate in candidates {
            if !tried.insert(candidate.path.clone()) {
                continue;
            }

            match self
                .validate(&candidate, &commit_keywords, &commit_text)
                .await
            {
                Validation::Accepted {
                    confidence,
                    warnings,
                } => {
                    info!(
                        path = %candidate.path,
                        origin = ?candidate.origin,
                        ?confidence,
                        "Selected screenshot"
                    );
                    resolution.warnings.extend(warnings);
                    resolution.selected = Some(ResolvedScreenshot {
                        candidate,
                        confidence: Some(confidence),
                    });
                    return resolution;
                }
                Validation::Rejected(reason) => {
                    debug!(path = %candidate.path, %reason, "Rejected screenshot candidate");
                    resolution.rejected.push(RejectedCandidate {
                        path: candidate.path,
                        origin: candidate.origin,
                        reason,
                    });
                }
            }
        }

        info!(
            rejected = resolution.rejected.len(),
            "No acceptable screenshot found"
        );
        resolution
    }

    fn from_directives(
        &self,
        commits: &[&ClassifiedCommit],
        listing: &HashMap<&str, &ImageFile>,
        resolution: &mut Resolution,
    ) -> Option<ResolvedScreenshot> {
        // Commits arrive oldest first; the newest directive wins.
        for commit in commits.iter().rev() {
            for path in directive_paths(&commit.commit.message) {
                match listing.get(path.as_str()) {
                    Some(image) => {
                        info!(
                            path = %path,
                            commit = %short_hash(&commit.commit.hash),
                            "Using screenshot directive"
                        );
                        return Some(ResolvedScreenshot {
                            candidate: ScreenshotCandidate::from_image(
                                image,
                                OriginTier::ExplicitDirective,
                            ),
                            confidence: None,
                        });
                    }
                    None => {
                        warn!(path = %path, "Screenshot directive names a missing image");
                        resolution.warnings.push(format!(
                            "Directive in {} names {path}, which is not a tracked image",
                            short_hash(&commit.commit.hash)
                        ));
                    }
                }
            }
        }
        None
    }

    /// Images changed by the commits, promotional first, then newest.
    fn co_located(
        &self,
        commits: &[&ClassifiedCommit],
        listing: &HashMap<&str, &ImageFile>,
    ) -> Vec<ScreenshotCandidate> {
        let mut found: HashMap<&str, (usize, &ImageFile)> = HashMap::new();
        for (index, commit) in commits.iter().enumerate() {
            for changed in &commit.commit.changed_files {
                let path = normalize_path(changed);
                if !is_image_path(&path) {
                    continue;
                }
                if let Some((key, image)) = listing.get_key_value(path.as_str()) {
                    found.insert(key, (index, image));
                }
            }
        }

        let mut ordered: Vec<(bool, usize, &ImageFile)> = found
            .into_values()
            .map(|(index, image)| (self.promotional.is_match(&image.path), index, image))
            .collect();
        ordered.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(b.2.modified.cmp(&a.2.modified))
                .then(b.1.cmp(&a.1))
                .then(a.2.path.cmp(&b.2.path))
        });

        debug!(count = ordered.len(), "Co-located screenshot candidates");
        ordered
            .into_iter()
            .map(|(_, _, image)| ScreenshotCandidate::from_image(image, OriginTier::CoLocated))
            .collect()
    }

    /// Promotional images, newest first.
    fn fallback(&self, images: &[ImageFile]) -> Vec<ScreenshotCandidate> {
        let mut promotional: Vec<&ImageFile> = images
            .iter()
            .filter(|image| self.promotional.is_match(&image.path))
            .collect();
        promotional.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.path.cmp(&b.path)));

        promotional
            .into_iter()
            .map(|image| ScreenshotCandidate::from_image(image, OriginTier::RepositoryFallback))
            .collect()
    }

    async fn validate(
        &self,
        candidate: &ScreenshotCandidate,
        commit_keywords: &BTreeSet<String>,
        commit_text: &str,
    ) -> Validation {
        let assessment = validation::assess_keywords(
            &self.taxonomy,
            &candidate.keywords,
            commit_keywords,
            self.config.min_shared_categories,
        );
        debug!(
            path = %candidate.path,
            confidence = ?assessment.confidence,
            candidate_categories = ?assessment.candidate_categories,
            commit_categories = ?assessment.commit_categories,
            "Keyword assessment"
        );

        if assessment.confidence == MatchConfidence::NoMatch {
            return Validation::Rejected(format!(
                "keyword categories {:?} do not overlap commit categories {:?}",
                assessment.candidate_categories, assessment.commit_categories
            ));
        }

        let report = match validation::check_structure(
            &candidate.path,
            &candidate.location,
            candidate.size,
            &self.config,
        ) {
            Ok(report) => report,
            Err(e) => return Validation::Rejected(format!("{e:#}")),
        };
        let mut warnings = report.warnings;

        let mut confidence = assessment.confidence;
        if confidence == MatchConfidence::Uncertain && self.config.deep_check.enabled {
            if let Some(checker) = &self.checker {
                match self
                    .deep_check(checker.as_ref(), candidate, commit_text)
                    .await
                {
                    DeepCheckVerdict::Confidence(c) => confidence = c,
                    DeepCheckVerdict::Reject(reason) => return Validation::Rejected(reason),
                    DeepCheckVerdict::Inconclusive(warning) => warnings.push(warning),
                }
            }
        }

        Validation::Accepted {
            confidence,
            warnings,
        }
    }

    async fn deep_check(
        &self,
        checker: &dyn ContentChecker,
        candidate: &ScreenshotCandidate,
        commit_text: &str,
    ) -> DeepCheckVerdict {
        let settings = &self.config.deep_check;
        let bytes = match tokio::fs::read(&candidate.location).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return DeepCheckVerdict::Inconclusive(format!(
                    "Deep content check skipped for {}: {e}",
                    candidate.path
                ))
            }
        };

        let outcome = deep_check::run_deep_check(
            checker,
            &bytes,
            deep_check::media_type_for(&candidate.location),
            commit_text,
            Duration::from_secs(settings.timeout_secs),
        )
        .await;

        match outcome {
            DeepCheckOutcome::Scored(score) if score >= settings.match_threshold => {
                DeepCheckVerdict::Confidence(MatchConfidence::Match)
            }
            DeepCheckOutcome::Scored(score) if score < settings.reject_threshold => {
                DeepCheckVerdict::Reject(format!(
                    "deep content check scored {score:.2}, below {:.2}",
                    settings.reject_threshold
                ))
            }
            DeepCheckOutcome::Scored(_) => DeepCheckVerdict::Confidence(MatchConfidence::Uncertain),
            DeepCheckOutcome::TimedOut => DeepCheckVerdict::Inconclusive(format!(
                "Deep content check for {} timed out after {}s",
                candidate.path, settings.timeout_secs
            )),
            DeepCheckOutcome::Failed(e) => DeepCheckVerdict::Inconclusive(format!(
                "Deep content check for {} failed: {e}",
                candidate.path
            )),
        }
    }
}

enum DeepCheckVerdict {
    Confidence(MatchConfidence),
    Reject(String),
    Inconclusive(String),
}
