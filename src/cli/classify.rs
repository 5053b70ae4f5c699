//! Classify command: shows the classifier's view of a range.

use anyhow::Result;
use clap::Parser;

use super::GlobalArgs;
use crate::classify::Classifier;
use crate::data::{to_yaml, ClassificationView};

/// Classify command options.
#[derive(Parser)]
pub struct ClassifyCommand {
    /// Revision range (default: <latest tag>..HEAD).
    #[arg(value_name = "RANGE")]
    pub range: Option<String>,
    /// Lists only commits that would be announced.
    #[arg(long)]
    pub player_facing: bool,
}

impl ClassifyCommand {
    /// Executes the classify command.
    pub fn execute(self, global: &GlobalArgs) -> Result<()> {
        let repo = global.open_repository()?;
        let config = global.load_config(&repo)?;
        let range = match self.range {
            Some(range) => range,
            None => repo.default_release_range()?,
        };

        let classifier = Classifier::new(&config.classifier)?;
        let commits = repo.get_commits_in_range(&range)?;
        let mut classified = classifier.classify_all(&commits);
        if self.player_facing {
            classified.retain(|c| c.is_player_facing());
        }
        // Newest first reads like `git log`.
        classified.reverse();

        let view = ClassificationView::new(&range, &classified);
        println!("{}", to_yaml(&view)?);
        Ok(())
    }
}
