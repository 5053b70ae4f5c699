//! Prompt templates for announcement writing and screenshot checks.

use crate::classify::conventional::display_subject;
use crate::classify::ClassifiedCommit;

/// System prompt for release announcements.
pub const ANNOUNCEMENT_SYSTEM_PROMPT: &str = r#"You write short release announcements for a video game's players.

You will receive the player-facing changes in a release, each with its kind (feature, fix, performance, revert) and a relevance score from 0 to 100, plus optional background about the game.

Rules:
1. Write for players, not developers. Never mention commits, hashes, branches, refactors or file paths.
2. Lead with the most relevant changes. Group small fixes together.
3. Keep the body under 200 words. Use short paragraphs or "- " bullet points.
4. Do not invent features that are not in the list.
5. Keep the tone upbeat and concrete.

Reply in exactly this format and nothing else:

TITLE: <one line title, at most 70 characters>

<body>"#;

/// System prompt for the screenshot content check.
pub const VISION_SYSTEM_PROMPT: &str = r#"You judge whether a screenshot from a video game illustrates a set of release notes.

Look at the image and the release notes. Reply with a single number between 0 and 1:
- 1 means the image clearly shows what the notes describe
- 0.5 means the image is plausibly related
- 0 means the image shows something unrelated

Reply with the number only."#;

/// Builds the user prompt for an announcement.
pub fn announcement_user_prompt(
    label: &str,
    commits: &[ClassifiedCommit],
    game_context: Option<&str>,
) -> String {
    let mut prompt = String::new();

    if let Some(context) = game_context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str("About the game:\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!("Release: {label}\n\nChanges:\n"));

    let mut ordered: Vec<&ClassifiedCommit> = commits.iter().collect();
    ordered.sort_by(|a, b| b.verdict.relevance.cmp(&a.verdict.relevance));
    for commit in ordered {
        let classification = serde_json::to_value(commit.verdict.classification)
            .ok()
            .and_then(|v| v.as_str().map(ToString::to_string))
            .unwrap_or_default();
        let breaking = if commit.verdict.breaking {
            " (breaking)"
        } else {
            ""
        };
        prompt.push_str(&format!(
            "- [{classification}, relevance {}{breaking}] {}\n",
            commit.verdict.relevance,
            display_subject(&commit.commit.message)
        ));
    }

    prompt
}

/// Builds the user prompt for the screenshot check.
pub fn vision_user_prompt(commit_text: &str) -> String {
    format!("Release notes:\n{}\n\nHow well does the screenshot illustrate these notes?", commit_text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::config::ClassifierConfig;
    use crate::git::CommitInfo;

    fn classified(message: &str) -> ClassifiedCommit {
        let commit = CommitInfo {
            hash: "a".repeat(40),
            author: "Dev <dev@example.com>".to_string(),
            date: chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00+00:00").unwrap(),
            message: message.to_string(),
            changed_files: Vec::new(),
        };
        Classifier::new(&ClassifierConfig::default())
            .unwrap()
            .classify_commit(&commit)
    }

    #[test]
    fn announcement_prompt_orders_by_relevance() {
        let commits = vec![
            classified("fix: crash on load"),
            classified("feat!: add dragon boss [shot: art/dragon.png]"),
        ];
        let prompt = announcement_user_prompt("v1.2.0", &commits, Some("A cozy dragon game."));

        assert!(prompt.starts_with("About the game:\nA cozy dragon game."));
        let dragon = prompt.find("add dragon boss").unwrap();
        let crash = prompt.find("crash on load").unwrap();
        assert!(dragon < crash);
        assert!(prompt.contains("[feature, relevance 85 (breaking)]"));
        assert!(!prompt.contains("[shot:"));
    }

    #[test]
    fn blank_context_is_omitted() {
        let prompt = announcement_user_prompt("v1", &[classified("feat: x")], Some("  "));
        assert!(prompt.starts_with("Release: v1"));
    }
}
