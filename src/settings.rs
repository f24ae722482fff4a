//! Settings loaded from `lintmark.toml`.
//!
//! ```toml
//! [lint]
//! debounce_ms = 500
//! file_extension = ".md"
//! source = "plain"        # or "serialized"
//! encoding = "utf16"      # or "code-point"
//! skip_blank = true
//! skip_unchanged = true
//!
//! [decorations]
//! overlap = "allow"       # or "later-wins"
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::document::OffsetEncoding;
use crate::lint::{DecorateOptions, OverlapPolicy, TextSource};

/// Name of the settings file searched for by [`discover_settings`].
pub const SETTINGS_FILE: &str = "lintmark.toml";

/// Root settings structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub lint: LintSettings,
    pub decorations: DecorationSettings,
}

/// When and what to lint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LintSettings {
    /// Quiet period after the last edit before a request is sent.
    pub debounce_ms: u64,
    /// Tells the engine which rules apply to the text.
    pub file_extension: String,
    pub source: TextSource,
    pub encoding: OffsetEncoding,
    /// Clear decorations instead of linting whitespace-only text.
    pub skip_blank: bool,
    /// Reuse the previous result when the text did not change.
    pub skip_unchanged: bool,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            file_extension: ".md".to_string(),
            source: TextSource::Plain,
            encoding: OffsetEncoding::Utf16,
            skip_blank: true,
            skip_unchanged: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecorationSettings {
    pub overlap: OverlapPolicy,
}

impl Settings {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.lint.debounce_ms)
    }

    pub fn decorate_options(&self) -> DecorateOptions {
        DecorateOptions {
            encoding: self.lint.encoding,
            overlap: self.decorations.overlap,
        }
    }
}

/// Parse settings from TOML text.
pub fn parse_settings(content: &str) -> Result<Settings, String> {
    let mut settings: Settings = toml::from_str(content).map_err(|e| e.to_string())?;
    settings.lint.file_extension = normalize_extension(&settings.lint.file_extension)?;
    Ok(settings)
}

/// Ensure an extension has exactly one leading dot.
fn normalize_extension(ext: &str) -> Result<String, String> {
    let bare = ext.trim().trim_start_matches('.');
    if bare.is_empty() {
        return Err(format!("invalid file_extension '{}'", ext));
    }
    Ok(format!(".{}", bare))
}

/// Load settings from a `lintmark.toml` file.
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(content) => match parse_settings(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), "failed to parse {}: {}", SETTINGS_FILE, e);
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

/// Discover `lintmark.toml` by searching up the directory tree, then direct
/// children.
///
/// Returns `(settings, settings_dir)` where `settings_dir` is the directory
/// containing the file. If none is found, returns
/// `(Settings::default(), start_dir)`.
pub fn discover_settings(start_dir: &Path) -> (Settings, PathBuf) {
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            return (load_settings(&candidate), dir.to_path_buf());
        }
        current = dir.parent();
    }

    if let Ok(entries) = std::fs::read_dir(start_dir) {
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                let candidate = entry.path().join(SETTINGS_FILE);
                if candidate.is_file() {
                    return (load_settings(&candidate), entry.path());
                }
            }
        }
    }

    (Settings::default(), start_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.quiet_period(), Duration::from_millis(500));
        assert_eq!(settings.lint.file_extension, ".md");
        assert_eq!(settings.lint.source, TextSource::Plain);
        assert_eq!(settings.lint.encoding, OffsetEncoding::Utf16);
        assert!(settings.lint.skip_blank);
        assert!(settings.lint.skip_unchanged);
        assert_eq!(settings.decorations.overlap, OverlapPolicy::Allow);
    }

    #[test]
    fn parse_partial_settings() {
        let settings = parse_settings(
            r#"
[lint]
debounce_ms = 250
source = "serialized"
encoding = "code-point"

[decorations]
overlap = "later-wins"
"#,
        )
        .unwrap();
        assert_eq!(settings.quiet_period(), Duration::from_millis(250));
        assert_eq!(settings.lint.source, TextSource::Serialized);
        assert_eq!(settings.lint.file_extension, ".md");
        assert_eq!(settings.decorate_options().encoding, OffsetEncoding::CodePoint);
        assert_eq!(settings.decorate_options().overlap, OverlapPolicy::LaterWins);
    }

    #[test]
    fn parse_normalizes_extension() {
        let settings = parse_settings("[lint]\nfile_extension = \"txt\"\n").unwrap();
        assert_eq!(settings.lint.file_extension, ".txt");
        assert!(parse_settings("[lint]\nfile_extension = \".\"\n").is_err());
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert!(parse_settings("[lint]\nsource = \"html\"\n").is_err());
        assert!(parse_settings("[lint]\ndebounce_ms = \"fast\"\n").is_err());
    }

    /// Create a unique temp directory for test isolation.
    fn make_test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("lintmark-test")
            .join(name)
            .join(format!("{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup_test_dir(dir: &Path) {
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn load_settings_falls_back_on_parse_error() {
        let dir = make_test_dir("load-invalid");
        let path = dir.join(SETTINGS_FILE);
        std::fs::write(&path, "[lint\ndebounce_ms = ").unwrap();

        assert_eq!(load_settings(&path), Settings::default());
        assert_eq!(load_settings(&dir.join("missing.toml")), Settings::default());

        cleanup_test_dir(&dir);
    }

    #[test]
    fn discover_settings_in_current_dir() {
        let dir = make_test_dir("discover-current");
        std::fs::write(dir.join(SETTINGS_FILE), "[lint]\ndebounce_ms = 100\n").unwrap();

        let (settings, settings_dir) = discover_settings(&dir);
        assert_eq!(settings_dir, dir);
        assert_eq!(settings.lint.debounce_ms, 100);

        cleanup_test_dir(&dir);
    }

    #[test]
    fn discover_settings_in_parent_dir() {
        let parent = make_test_dir("discover-parent");
        let child = parent.join("subdir");
        std::fs::create_dir_all(&child).unwrap();
        std::fs::write(parent.join(SETTINGS_FILE), "[lint]\nskip_blank = false\n").unwrap();

        let (settings, settings_dir) = discover_settings(&child);
        assert_eq!(settings_dir, parent);
        assert!(!settings.lint.skip_blank);

        cleanup_test_dir(&parent);
    }

    #[test]
    fn discover_settings_in_child_dir() {
        let parent = make_test_dir("discover-child");
        let child = parent.join("config");
        std::fs::create_dir_all(&child).unwrap();
        std::fs::write(
            child.join(SETTINGS_FILE),
            "[decorations]\noverlap = \"later-wins\"\n",
        )
        .unwrap();

        let (settings, settings_dir) = discover_settings(&parent);
        assert_eq!(settings_dir, child);
        assert_eq!(settings.decorations.overlap, OverlapPolicy::LaterWins);

        cleanup_test_dir(&parent);
    }

    #[test]
    fn discover_settings_not_found() {
        let dir = make_test_dir("discover-none");

        let (settings, settings_dir) = discover_settings(&dir);
        assert_eq!(settings_dir, dir);
        assert_eq!(settings, Settings::default());

        cleanup_test_dir(&dir);
    }

    #[test]
    fn discover_settings_parent_preferred_over_child() {
        let parent = make_test_dir("discover-priority");
        let child = parent.join("nested");
        std::fs::create_dir_all(&child).unwrap();
        std::fs::write(parent.join(SETTINGS_FILE), "[lint]\ndebounce_ms = 1\n").unwrap();
        std::fs::write(child.join(SETTINGS_FILE), "[lint]\ndebounce_ms = 2\n").unwrap();

        let (settings, settings_dir) = discover_settings(&parent);
        assert_eq!(settings_dir, parent);
        assert_eq!(settings.lint.debounce_ms, 1);

        cleanup_test_dir(&parent);
    }
}
