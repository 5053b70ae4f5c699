//! Cheap candidate validation: keyword match and structural checks.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::taxonomy::Taxonomy;
use crate::config::{Category, ResolverConfig};
use crate::utils::{format_bytes, format_dimensions};

/// How well a candidate aligns with the commits that selected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchConfidence {
    /// Categories overlap.
    Match,
    /// Not enough information either way.
    Uncertain,
    /// Both sides categorized and disjoint.
    NoMatch,
}

/// Result of the keyword tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordAssessment {
    /// Derived confidence.
    pub confidence: MatchConfidence,
    /// Categories found in the candidate path.
    pub candidate_categories: BTreeSet<Category>,
    /// Categories found in the commit messages.
    pub commit_categories: BTreeSet<Category>,
}

/// Maps both keyword sets onto the taxonomy and compares them.
///
/// At least `min_shared` shared categories (never fewer than one) make a
/// match; two non-empty sets short of that are a no-match; an empty side is
/// uncertain.
pub fn assess_keywords(
    taxonomy: &Taxonomy,
    candidate_keywords: &BTreeSet<String>,
    commit_keywords: &BTreeSet<String>,
    min_shared: usize,
) -> KeywordAssessment {
    let candidate_categories = taxonomy.categories(candidate_keywords);
    let commit_categories = taxonomy.categories(commit_keywords);

    let confidence = if candidate_categories.is_empty() || commit_categories.is_empty() {
        MatchConfidence::Uncertain
    } else {
        let shared = candidate_categories
            .intersection(&commit_categories)
            .count();
        if shared >= min_shared.max(1) {
            MatchConfidence::Match
        } else {
            MatchConfidence::NoMatch
        }
    };

    KeywordAssessment {
        confidence,
        candidate_categories,
        commit_categories,
    }
}

/// Result of the structural tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralReport {
    /// Image width from the file header.
    pub width: u32,
    /// Image height from the file header.
    pub height: u32,
    /// Advisory warnings for the approver.
    pub warnings: Vec<String>,
}

/// Reads the image header and file size and attaches warnings.
///
/// Only an unreadable header is an error; size and resolution problems are
/// warnings.
pub fn check_structure(
    display_path: &str,
    location: &Path,
    size: u64,
    config: &ResolverConfig,
) -> Result<StructuralReport> {
    let (width, height) = image::image_dimensions(location)
        .with_context(|| format!("Failed to read image header: {}", location.display()))?;

    let mut warnings = Vec::new();
    if width < config.min_width || height < config.min_height {
        warnings.push(format!(
            "{display_path} is {}, below the recommended {}",
            format_dimensions(width, height),
            format_dimensions(config.min_width, config.min_height)
        ));
    }
    if size > config.max_file_bytes {
        warnings.push(format!(
            "{display_path} is {}, above the recommended maximum of {}",
            format_bytes(size),
            format_bytes(config.max_file_bytes)
        ));
    }

    Ok(StructuralReport {
        width,
        height,
        warnings,
    })
}
