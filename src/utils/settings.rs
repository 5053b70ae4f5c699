//! User settings from `$HOME/.patchnote/settings.json`.
//!
//! The file only carries environment overrides, typically the API key, so
//! credentials stay out of the repository's `.patchnote.yaml`. Real
//! environment variables always win over the file.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Overrides `$HOME/.patchnote` as the settings directory.
pub const SETTINGS_DIR_VAR: &str = "PATCHNOTE_SETTINGS_DIR";

/// Settings loaded from `$HOME/.patchnote/settings.json`.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Environment variable fallbacks.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Settings {
    /// Loads settings from the default location; a missing file is empty.
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::settings_path()?)
    }

    /// Loads settings from `path`; a missing file is empty.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Location of the settings file.
    pub fn settings_path() -> Result<PathBuf> {
        let dir = match env::var_os(SETTINGS_DIR_VAR).filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("Failed to determine home directory")?
                .join(".patchnote"),
        };
        Ok(dir.join("settings.json"))
    }

    /// Looks `key` up in the environment, then in these settings.
    pub fn lookup(&self, key: &str) -> Option<String> {
        env::var(key).ok().or_else(|| self.env.get(key).cloned())
    }
}

/// Reads an environment variable, falling back to the settings file.
pub fn get_env_var(key: &str) -> Result<String> {
    if let Ok(value) = env::var(key) {
        return Ok(value);
    }
    let settings = Settings::load()
        .with_context(|| format!("Environment variable not found: {key}"))?;
    settings
        .env
        .get(key)
        .cloned()
        .ok_or_else(|| anyhow!("Environment variable not found: {key}"))
}

/// Returns the first of `keys` that is set.
pub fn get_env_vars(keys: &[&str]) -> Result<String> {
    keys.iter()
        .find_map(|key| get_env_var(key).ok())
        .ok_or_else(|| anyhow!("None of the environment variables found: {keys:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_settings(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("settings.json");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn loads_env_overrides() {
        let dir = TempDir::new().unwrap();
        let path = write_settings(&dir, r#"{ "env": { "CLAUDE_API_KEY": "from-file" } }"#);

        let settings = Settings::load_from_path(&path).unwrap();
        assert_eq!(settings.env["CLAUDE_API_KEY"], "from-file");
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(dir.path().join("absent.json")).unwrap();
        assert!(settings.env.is_empty());
    }

    #[test]
    fn malformed_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = write_settings(&dir, "{ not json");
        let err = Settings::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("settings.json"));
    }

    #[test]
    fn environment_wins_over_file() {
        let dir = TempDir::new().unwrap();
        let path = write_settings(
            &dir,
            r#"{ "env": { "PATCHNOTE_TEST_LOOKUP": "file", "PATCHNOTE_TEST_ONLY_FILE": "file" } }"#,
        );
        let settings = Settings::load_from_path(&path).unwrap();

        env::set_var("PATCHNOTE_TEST_LOOKUP", "env");
        assert_eq!(settings.lookup("PATCHNOTE_TEST_LOOKUP").as_deref(), Some("env"));
        env::remove_var("PATCHNOTE_TEST_LOOKUP");

        assert_eq!(settings.lookup("PATCHNOTE_TEST_LOOKUP").as_deref(), Some("file"));
        assert_eq!(settings.lookup("PATCHNOTE_TEST_ONLY_FILE").as_deref(), Some("file"));
        assert!(settings.lookup("PATCHNOTE_TEST_NOWHERE").is_none());
    }
}
