//! Conventional commit header parsing.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^()\r\n]*)\))?(?P<bang>!)?:\s*(?P<subject>\S.*)$")
        .unwrap()
});

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static BREAKING_FOOTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^BREAKING[ -]CHANGE:").unwrap());

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static GIT_REVERT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^Revert ".+"$"#).unwrap());

/// Declared conventional commit types this tool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
    /// `feat` / `feature`
    Feat,
    /// `fix`
    Fix,
    /// `perf`
    Perf,
    /// `revert`
    Revert,
    /// `chore`
    Chore,
    /// `docs`
    Docs,
    /// `style`
    Style,
    /// `refactor`
    Refactor,
    /// `test`
    Test,
    /// `build`
    Build,
    /// `ci`
    Ci,
}

impl CommitType {
    /// Parses a type token, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        let kind = match token.to_ascii_lowercase().as_str() {
            "feat" | "feature" => Self::Feat,
            "fix" => Self::Fix,
            "perf" => Self::Perf,
            "revert" => Self::Revert,
            "chore" => Self::Chore,
            "docs" => Self::Docs,
            "style" => Self::Style,
            "refactor" => Self::Refactor,
            "test" | "tests" => Self::Test,
            "build" => Self::Build,
            "ci" => Self::Ci,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Perf => "perf",
            Self::Revert => "revert",
            Self::Chore => "chore",
            Self::Docs => "docs",
            Self::Style => "style",
            Self::Refactor => "refactor",
            Self::Test => "test",
            Self::Build => "build",
            Self::Ci => "ci",
        }
    }
}

/// Parsed conventional commit header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalHeader {
    /// Declared type.
    pub commit_type: CommitType,
    /// Optional scope between parentheses.
    pub scope: Option<String>,
    /// Whether a `!` marker or `BREAKING CHANGE:` footer is present.
    pub breaking: bool,
    /// Text after the colon.
    pub subject: String,
}

/// Parses the first line of a message as a conventional commit header.
///
/// Returns `None` for free-form messages and for unknown types, which are
/// left to the keyword heuristics. Git's own `Revert "..."` subject counts
/// as a declared revert.
pub fn parse_header(message: &str) -> Option<ConventionalHeader> {
    let first_line = message.lines().next().unwrap_or("").trim();

    if GIT_REVERT_PATTERN.is_match(first_line) {
        return Some(ConventionalHeader {
            commit_type: CommitType::Revert,
            scope: None,
            breaking: false,
            subject: first_line.to_string(),
        });
    }

    let captures = HEADER_PATTERN.captures(first_line)?;
    let commit_type = CommitType::parse(&captures["type"])?;

    let breaking = captures.name("bang").is_some() || BREAKING_FOOTER_PATTERN.is_match(message);

    Some(ConventionalHeader {
        commit_type,
        scope: captures
            .name("scope")
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty()),
        breaking,
        subject: captures["subject"].trim().to_string(),
    })
}

/// Strips a conventional prefix and any inline screenshot directive,
/// leaving a human-readable subject line.
pub fn display_subject(message: &str) -> String {
    let subject = match parse_header(message) {
        Some(header) if header.commit_type != CommitType::Revert => header.subject,
        _ => message.lines().next().unwrap_or("").trim().to_string(),
    };
    crate::resolve::directive::strip_directives(&subject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_type() {
        let header = parse_header("feat: add dragon boss").unwrap();
        assert_eq!(header.commit_type, CommitType::Feat);
        assert_eq!(header.scope, None);
        assert!(!header.breaking);
        assert_eq!(header.subject, "add dragon boss");
    }

    #[test]
    fn parses_scope_and_bang() {
        let header = parse_header("fix(save)!: migrate slot format").unwrap();
        assert_eq!(header.commit_type, CommitType::Fix);
        assert_eq!(header.scope.as_deref(), Some("save"));
        assert!(header.breaking);
    }

    #[test]
    fn breaking_footer_marks_breaking() {
        let header =
            parse_header("feat: new controls\n\nBREAKING CHANGE: old bindings removed").unwrap();
        assert!(header.breaking);
    }

    #[test]
    fn type_is_case_insensitive() {
        let header = parse_header("Perf: faster shadows").unwrap();
        assert_eq!(header.commit_type, CommitType::Perf);
    }

    #[test]
    fn unknown_type_is_not_conventional() {
        assert!(parse_header("wip: half a boss").is_none());
        assert!(parse_header("Add dragon boss").is_none());
    }

    #[test]
    fn empty_subject_is_not_conventional() {
        assert!(parse_header("feat:").is_none());
        assert!(parse_header("feat:   ").is_none());
    }

    #[test]
    fn git_revert_subject_is_revert() {
        let header = parse_header("Revert \"feat: add dragon boss\"").unwrap();
        assert_eq!(header.commit_type, CommitType::Revert);
    }

    #[test]
    fn display_subject_strips_prefix_and_directive() {
        assert_eq!(
            display_subject("feat(boss): add dragon boss [shot: art/dragon.png]"),
            "add dragon boss"
        );
        assert_eq!(display_subject("Tweak jump height"), "Tweak jump height");
    }
}
