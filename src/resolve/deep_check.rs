//! Time-boxed deep content check for inconclusive candidates.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

/// External collaborator scoring how well an image depicts commit text.
pub trait ContentChecker: Send + Sync {
    /// Returns an alignment score in `0.0..=1.0`.
    fn alignment_score<'a>(
        &'a self,
        image: &'a [u8],
        media_type: &'a str,
        commit_text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<f32>> + Send + 'a>>;
}

/// Outcome of a deep check attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DeepCheckOutcome {
    /// The checker answered in time.
    Scored(f32),
    /// The checker did not answer before the deadline; the call was dropped.
    TimedOut,
    /// The checker returned an error.
    Failed(String),
}

/// Runs the checker under a hard timeout.
pub async fn run_deep_check(
    checker: &dyn ContentChecker,
    image: &[u8],
    media_type: &str,
    commit_text: &str,
    timeout: Duration,
) -> DeepCheckOutcome {
    debug!(
        image_len = image.len(),
        timeout_ms = timeout.as_millis() as u64,
        "Starting deep content check"
    );

    match tokio::time::timeout(
        timeout,
        checker.alignment_score(image, media_type, commit_text),
    )
    .await
    {
        Ok(Ok(score)) if score.is_finite() => DeepCheckOutcome::Scored(score.clamp(0.0, 1.0)),
        Ok(Ok(score)) => DeepCheckOutcome::Failed(format!("non-finite score {score}")),
        Ok(Err(e)) => {
            warn!(error = %e, "Deep content check failed");
            DeepCheckOutcome::Failed(e.to_string())
        }
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Deep content check timed out"
            );
            DeepCheckOutcome::TimedOut
        }
    }
}

/// MIME type for an image path, by extension.
pub fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/png",
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Checker returning a fixed result after an optional delay.
    pub(crate) struct FixedChecker {
        pub(crate) result: std::result::Result<f32, String>,
        pub(crate) delay: Duration,
    }

    impl FixedChecker {
        pub(crate) fn score(score: f32) -> Self {
            Self {
                result: Ok(score),
                delay: Duration::ZERO,
            }
        }

        pub(crate) fn hanging() -> Self {
            Self {
                result: Ok(1.0),
                delay: Duration::from_secs(30),
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            Self {
                result: Err(message.to_string()),
                delay: Duration::ZERO,
            }
        }
    }

    impl ContentChecker for FixedChecker {
        fn alignment_score<'a>(
            &'a self,
            _image: &'a [u8],
            _media_type: &'a str,
            _commit_text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<f32>> + Send + 'a>> {
            Box::pin(async move {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.result.clone().map_err(|e| anyhow::anyhow!(e))
            })
        }
    }
}
