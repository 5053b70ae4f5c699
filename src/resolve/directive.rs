//! Inline screenshot directives such as `[shot: art/dragon.png]`.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static DIRECTIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*(?:shot|screenshot|banner)\s*:\s*(?P<path>[^\]\r\n]+?)\s*\]").unwrap()
});

/// Returns every image path named by a directive, in message order.
pub fn directive_paths(message: &str) -> Vec<String> {
    DIRECTIVE_PATTERN
        .captures_iter(message)
        .map(|c| normalize_path(&c["path"]))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Removes directives from a line of text.
pub fn strip_directives(text: &str) -> String {
    let stripped = DIRECTIVE_PATTERN.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a user-written repository path to `/`-separated relative form.
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');
    let path = path.replace('\\', "/");
    let mut path = path.as_str();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_shot_directive() {
        assert_eq!(
            directive_paths("feat: add dragon boss [shot: art/dragon.png]"),
            vec!["art/dragon.png"]
        );
    }

    #[test]
    fn aliases_and_case() {
        let message = "feat: new menu\n\n[Screenshot: ./promo/menu.png]\n[BANNER: promo\\title.jpg]";
        assert_eq!(
            directive_paths(message),
            vec!["promo/menu.png", "promo/title.jpg"]
        );
    }

    #[test]
    fn quoted_paths_are_unquoted() {
        assert_eq!(
            directive_paths("fix: sky [shot: \"art/sky box.png\"]"),
            vec!["art/sky box.png"]
        );
    }

    #[test]
    fn no_directive() {
        assert!(directive_paths("feat: add dragon boss").is_empty());
        assert!(directive_paths("feat: [shot: ]").is_empty());
    }

    #[test]
    fn strip_removes_directive() {
        assert_eq!(
            strip_directives("add dragon boss [shot: art/dragon.png]"),
            "add dragon boss"
        );
    }
}
