//! Per-module source layout, used to rebuild full paths when a suffix lookup
//! is ambiguous across modules with identical relative layouts.

use std::path::{Component, Path, PathBuf};

/// Module name for a module (or project) key: the text after the last `:`,
/// or the whole key when nothing follows the colon.
pub fn module_name(key: &str) -> &str {
    match key.rfind(':') {
        Some(idx) if idx + 1 < key.len() => &key[idx + 1..],
        _ => key,
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into its
/// parent where possible. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCoverageContext {
    pub name: String,
    pub base_dir: PathBuf,
    /// Source roots or individual source files, always absolute.
    pub sources: Vec<PathBuf>,
}

impl ModuleCoverageContext {
    /// Relative `sources` are resolved against `base_dir`.
    pub fn new<I, P>(name: impl Into<String>, base_dir: impl Into<PathBuf>, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let base_dir = normalize(&base_dir.into());
        let sources = sources
            .into_iter()
            .map(|s| {
                let s = s.as_ref();
                if s.is_absolute() {
                    normalize(s)
                } else {
                    normalize(&base_dir.join(s))
                }
            })
            .collect();
        Self {
            name: name.into(),
            base_dir,
            sources,
        }
    }
}

/// All module contexts of a project plus the project base directory that
/// indexed relative paths are computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectCoverageIndex {
    base_dir: PathBuf,
    modules: Vec<ModuleCoverageContext>,
}

impl ProjectCoverageIndex {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: normalize(&base_dir.into()),
            modules: Vec::new(),
        }
    }

    pub fn with_modules(
        base_dir: impl Into<PathBuf>,
        modules: impl IntoIterator<Item = ModuleCoverageContext>,
    ) -> Self {
        let mut index = Self::new(base_dir);
        index.modules.extend(modules);
        index
    }

    /// Modules called `name`, in registration order.
    pub fn modules_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a ModuleCoverageContext> + 'a {
        self.modules.iter().filter(move |m| m.name == name)
    }

    /// Segments of `path` relative to the project base directory, or `None`
    /// when `path` lies outside of it.
    pub fn relative_segments(&self, path: &Path) -> Option<Vec<String>> {
        let relative = normalize(path);
        let relative = relative.strip_prefix(&self.base_dir).ok()?;
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str().map(str::to_string),
                _ => None,
            })
            .collect();
        if segments.is_empty() {
            None
        } else {
            Some(segments)
        }
    }
}
