//! Indexed source files of the analyzed project.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Result;
use crate::module::normalize;

const MAX_DEPTH: usize = 64;

const BOM: char = '\u{feff}';

pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Kotlin,
    Other,
}

impl Language {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("java") => Language::Java,
            Some("kt") | Some("kts") => Language::Kotlin,
            _ => Language::Other,
        }
    }
}

/// A source file known to the host: its project-relative path, the module it
/// belongs to and where to read it from.
#[derive(Debug, Clone)]
pub struct InputFile {
    relative_path: String,
    module: String,
    language: Language,
    path: PathBuf,
    contents: Option<String>,
}

impl InputFile {
    /// `relative_path` uses `/` separators and is relative to the project
    /// base directory.
    pub fn new(
        path: impl Into<PathBuf>,
        relative_path: impl Into<String>,
        module: impl Into<String>,
    ) -> Self {
        let relative_path = relative_path.into().replace('\\', "/");
        Self {
            language: Language::from_path(Path::new(&relative_path)),
            relative_path,
            module: module.into(),
            path: path.into(),
            contents: None,
        }
    }

    /// Attach contents so they are never read from disk.
    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn segments(&self) -> Vec<&str> {
        crate::tree::split_path(&self.relative_path)
    }

    pub fn filename(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File text without a leading byte order mark.
    pub fn contents(&self) -> std::io::Result<Cow<'_, str>> {
        match &self.contents {
            Some(text) => Ok(Cow::Borrowed(strip_bom(text))),
            None => {
                let mut text = std::fs::read_to_string(&self.path)?;
                if text.starts_with(BOM) {
                    text.drain(..BOM.len_utf8());
                }
                Ok(Cow::Owned(text))
            }
        }
    }

    /// Number of lines, counting the (possibly empty) line after the last
    /// newline.
    pub fn line_count(&self) -> std::io::Result<usize> {
        let text = self.contents()?;
        Ok(text.bytes().filter(|&b| b == b'\n').count() + 1)
    }
}

impl fmt::Display for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative_path)
    }
}

/// Enumerate every regular file below the configured source roots of every
/// module, sorted by relative path. Hidden directories are skipped and files
/// outside the project base directory are ignored.
pub fn discover_inputs(config: &Config) -> Result<Vec<InputFile>> {
    let base = normalize(&config.base_dir());
    let mut seen = HashSet::new();
    let mut inputs = Vec::new();

    for module in config.module_contexts() {
        for root in &module.sources {
            if !root.exists() {
                debug!(root = %root.display(), module = %module.name, "Source root does not exist");
                continue;
            }
            let walker = WalkDir::new(root)
                .max_depth(MAX_DEPTH)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(root = %root.display(), "Skipping unreadable entry: {err}");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = normalize(entry.path());
                let Some(relative) = relative_slash_path(&base, &path) else {
                    warn!(
                        path = %path.display(),
                        "Source file outside of the project base directory"
                    );
                    continue;
                };
                if seen.insert(path.clone()) {
                    inputs.push(InputFile::new(path, relative, module.name.clone()));
                }
            }
        }
    }

    inputs.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    debug!(count = inputs.len(), "Discovered input files");
    Ok(inputs)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let segments: Vec<&str> = relative
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("a/B.java")), Language::Java);
        assert_eq!(Language::from_path(Path::new("a/B.kt")), Language::Kotlin);
        assert_eq!(Language::from_path(Path::new("build.gradle.kts")), Language::Kotlin);
        assert_eq!(Language::from_path(Path::new("README")), Language::Other);
    }

    #[test]
    fn test_preset_contents() {
        let file = InputFile::new("/nowhere/App.kt", "src/org/App.kt", "app")
            .with_contents("package org\n\nclass App\n");
        assert_eq!(file.filename(), "App.kt");
        assert_eq!(file.segments(), vec!["src", "org", "App.kt"]);
        assert_eq!(file.language(), Language::Kotlin);
        assert_eq!(file.line_count().unwrap(), 4);
        assert_eq!(file.to_string(), "src/org/App.kt");
    }

    #[test]
    fn test_contents_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.java");
        std::fs::write(&path, "class A {}").unwrap();
        let file = InputFile::new(&path, "A.java", "m");
        assert_eq!(file.contents().unwrap(), "class A {}");
        assert_eq!(file.line_count().unwrap(), 1);

        let missing = InputFile::new(dir.path().join("B.java"), "B.java", "m");
        assert!(missing.contents().is_err());
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.kt");
        std::fs::write(&path, "\u{feff}package a\n").unwrap();
        let file = InputFile::new(&path, "A.kt", "m");
        assert_eq!(file.contents().unwrap(), "package a\n");
        assert_eq!(file.line_count().unwrap(), 2);

        let preset = InputFile::new("/p/B.kt", "B.kt", "m").with_contents("\u{feff}package b");
        assert_eq!(preset.contents().unwrap(), "package b");
    }

    #[test]
    fn test_backslashes_are_normalized() {
        let file = InputFile::new("C:/p/src/A.java", "src\\org\\A.java", "m");
        assert_eq!(file.relative_path(), "src/org/A.java");
        assert_eq!(file.filename(), "A.java");
    }
}
