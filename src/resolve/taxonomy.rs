//! Keyword extraction and category mapping.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::Category;

/// Words that carry no meaning for screenshot matching.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "into", "png", "jpg", "jpeg", "webp", "gif", "bmp",
    "tga", "img", "image", "images", "shot", "shots", "screenshot", "screenshots", "promo",
    "marketing", "press", "final", "copy", "new", "old", "feat", "fix",
];

/// Immutable keyword → category lookup built once from configuration.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    index: HashMap<String, Vec<Category>>,
}

impl Taxonomy {
    /// Compiles a category table into a lookup.
    pub fn new(table: &BTreeMap<Category, Vec<String>>) -> Self {
        let mut index: HashMap<String, Vec<Category>> = HashMap::new();
        for (category, words) in table {
            for word in words {
                let entry = index.entry(word.trim().to_lowercase()).or_default();
                if !entry.contains(category) {
                    entry.push(*category);
                }
            }
        }
        Self { index }
    }

    /// Maps keywords onto the categories they belong to.
    pub fn categories<'a, I>(&self, keywords: I) -> BTreeSet<Category>
    where
        I: IntoIterator<Item = &'a String>,
    {
        keywords
            .into_iter()
            .filter_map(|word| self.lookup(word))
            .flatten()
            .copied()
            .collect()
    }

    fn lookup(&self, word: &str) -> Option<&Vec<Category>> {
        self.index.get(word).or_else(|| {
            // Plural forms: "dragons" → "dragon", "bosses" → "boss"
            word.strip_suffix("es")
                .and_then(|stem| self.index.get(stem))
                .or_else(|| word.strip_suffix('s').and_then(|stem| self.index.get(stem)))
        })
    }
}

/// Extracts normalized keywords from a file name and its containing directories.
pub fn path_keywords(path: &str) -> BTreeSet<String> {
    let path = std::path::Path::new(path);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let mut keywords = text_keywords(stem);
    if let Some(parent) = path.parent() {
        for component in parent.components() {
            if let Some(dir) = component.as_os_str().to_str() {
                keywords.extend(text_keywords(dir));
            }
        }
    }
    keywords
}

/// Extracts normalized keywords from free text.
pub fn text_keywords(text: &str) -> BTreeSet<String> {
    split_words(text)
        .into_iter()
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= 2)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Splits on non-alphanumerics, camelCase humps and letter/digit boundaries.
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }

        if let Some(p) = prev {
            let hump = p.is_lowercase() && c.is_uppercase();
            let digit_edge = p.is_ascii_digit() != c.is_ascii_digit();
            if (hump || digit_edge) && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
        prev = Some(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_taxonomy;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn path_keywords_split_name_and_dirs() {
        assert_eq!(
            path_keywords("promo/bossFights/dragon_lair-02.png"),
            set(&["boss", "dragon", "fights", "lair"])
        );
    }

    #[test]
    fn text_keywords_drop_noise() {
        assert_eq!(
            text_keywords("feat: add the Dragon boss (v2)"),
            set(&["add", "boss", "dragon"])
        );
    }

    #[test]
    fn categories_include_plurals() {
        let taxonomy = Taxonomy::new(&default_taxonomy());
        let cats = taxonomy.categories(&set(&["dragons", "swords", "unknownword"]));
        assert!(cats.contains(&Category::Character));
        assert!(cats.contains(&Category::Combat));
        assert_eq!(cats.len(), 2);
    }

    #[test]
    fn keyword_can_map_to_several_categories() {
        let mut table = BTreeMap::new();
        table.insert(Category::Character, vec!["boss".to_string()]);
        table.insert(Category::Combat, vec!["Boss".to_string()]);
        let taxonomy = Taxonomy::new(&table);
        let cats = taxonomy.categories(&set(&["boss"]));
        assert_eq!(cats.len(), 2);
    }
}
