//! Release announcement text: AI-written with a deterministic fallback.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai::prompts::{announcement_user_prompt, ANNOUNCEMENT_SYSTEM_PROMPT};
use crate::ai::AiClient;
use crate::classify::conventional::display_subject;
use crate::classify::{Classification, ClassifiedCommit};

const MAX_TITLE_CHARS: usize = 100;

/// Who wrote the announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnouncementSource {
    /// Generated by the AI client.
    Ai,
    /// Built from commit subjects.
    Fallback,
}

/// Title and body of a release announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// One-line title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Who wrote it.
    pub generated_by: AnnouncementSource,
}

/// Writes announcements from player-facing commits.
pub struct AnnouncementWriter {
    client: Option<Box<dyn AiClient>>,
    game_context: Option<String>,
}

impl AnnouncementWriter {
    /// Creates a writer; without a client every announcement is a fallback.
    pub fn new(client: Option<Box<dyn AiClient>>) -> Self {
        Self {
            client,
            game_context: None,
        }
    }

    /// Adds background text about the game to every prompt.
    pub fn with_game_context(mut self, context: Option<String>) -> Self {
        self.game_context = context;
        self
    }

    /// Writes the announcement. AI failures fall back silently to the
    /// deterministic draft.
    pub async fn write(&self, label: &str, commits: &[ClassifiedCommit]) -> Announcement {
        let Some(client) = &self.client else {
            return fallback_announcement(label, commits);
        };

        let prompt = announcement_user_prompt(label, commits, self.game_context.as_deref());
        match client
            .send_request(ANNOUNCEMENT_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(reply) => match parse_reply(&reply) {
                Some((title, body)) => {
                    info!(model = %client.get_metadata().model, "Generated announcement");
                    Announcement {
                        title,
                        body,
                        generated_by: AnnouncementSource::Ai,
                    }
                }
                None => {
                    warn!("AI reply had no usable title, using fallback announcement");
                    fallback_announcement(label, commits)
                }
            },
            Err(e) => {
                warn!(error = %e, "Announcement generation failed, using fallback");
                fallback_announcement(label, commits)
            }
        }
    }
}

/// Splits a `TITLE: ...` reply into title and body.
pub fn parse_reply(reply: &str) -> Option<(String, String)> {
    let reply = reply.trim();
    let mut lines = reply.lines();
    let first = lines.next()?.trim();

    let title = first
        .strip_prefix("TITLE:")
        .or_else(|| first.strip_prefix("Title:"))
        .unwrap_or(first)
        .trim()
        .trim_matches(|c| c == '#' || c == '*' || c == '"')
        .trim();
    if title.is_empty() {
        return None;
    }

    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    if body.is_empty() {
        return None;
    }

    Some((truncate_chars(title, MAX_TITLE_CHARS), body))
}

/// Builds a grouped bullet list from commit subjects.
pub fn fallback_announcement(label: &str, commits: &[ClassifiedCommit]) -> Announcement {
    let sections = [
        (Classification::Feature, "New"),
        (Classification::Fix, "Fixed"),
        (Classification::Performance, "Faster"),
        (Classification::Revert, "Rolled back"),
    ];

    let mut body = String::new();
    for (classification, heading) in sections {
        let mut group: Vec<&ClassifiedCommit> = commits
            .iter()
            .filter(|c| c.verdict.classification == classification)
            .collect();
        if group.is_empty() {
            continue;
        }
        group.sort_by(|a, b| b.verdict.relevance.cmp(&a.verdict.relevance));

        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(heading);
        body.push_str(":\n");
        for commit in group {
            let subject = display_subject(&commit.commit.message);
            if subject.is_empty() {
                continue;
            }
            body.push_str("- ");
            body.push_str(&capitalize(&subject));
            if commit.verdict.breaking {
                body.push_str(" (breaking)");
            }
            body.push('\n');
        }
    }

    Announcement {
        title: format!("Update {label}"),
        body: body.trim_end().to_string(),
        generated_by: AnnouncementSource::Fallback,
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => text[..index].trim_end().to_string(),
        None => text.to_string(),
    }
}
