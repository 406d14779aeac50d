//! Resolution of report path patterns (`**/jacoco*.xml`, `target/*/x.xml`,
//! plain paths) to the files they name.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::error;
use walkdir::WalkDir;

const SEARCH_MAX_DEPTH: usize = 64;

const SPECIAL_CHARS: &[char] = &['*', '?'];

/// Replace backslashes with forward slashes.
pub fn to_unix_like_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Byte index of the first `*` or `?` in `path`.
pub fn index_of_special_char(path: &str) -> Option<usize> {
    path.find(SPECIAL_CHARS)
}

/// Whether `pattern` contains a wildcard, once separators are normalized.
pub fn is_wildcard(pattern: &str) -> bool {
    index_of_special_char(&to_unix_like_path(pattern)).is_some()
}

/// A path pattern split into the directory prefix that contains no wildcard
/// and the wildcard suffix matched below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardScanner {
    known_prefix: PathBuf,
    suffix: Option<String>,
}

impl WildcardScanner {
    pub fn new(pattern: &str) -> Self {
        let pattern = to_unix_like_path(pattern);
        let Some(special) = index_of_special_char(&pattern) else {
            return Self {
                known_prefix: PathBuf::from(pattern),
                suffix: None,
            };
        };
        match pattern[..special].rfind('/') {
            Some(slash) => Self {
                known_prefix: PathBuf::from(&pattern[..=slash]),
                suffix: Some(pattern[slash + 1..].to_string()),
            },
            None => Self {
                known_prefix: PathBuf::from("."),
                suffix: Some(pattern),
            },
        }
    }

    /// Files under `base` matching the pattern, in walk order.
    ///
    /// A pattern without wildcards yields `base.join(pattern)` if it names a
    /// regular file. Wildcard matches are returned as canonical paths. Scan
    /// failures are passed to `on_error` and yield no paths.
    pub fn scan(&self, base: &Path, mut on_error: impl FnMut(String)) -> Vec<PathBuf> {
        let Some(suffix) = &self.suffix else {
            let path = base.join(&self.known_prefix);
            return if path.is_file() { vec![path] } else { Vec::new() };
        };

        let root = base.join(&self.known_prefix);
        if !root.exists() {
            return Vec::new();
        }
        match scan_wildcard(&root, suffix) {
            Ok(paths) => paths,
            Err(message) => {
                on_error(format!(
                    "Scanning '{}' with pattern '{}' failed: {}",
                    root.display(),
                    suffix,
                    message
                ));
                Vec::new()
            }
        }
    }
}

fn scan_wildcard(root: &Path, suffix: &str) -> Result<Vec<PathBuf>, String> {
    let real = root.canonicalize().map_err(|e| e.to_string())?;
    if real.parent().is_none() {
        return Err(
            "For performance reason, wildcard pattern search is not possible from filesystem root"
                .to_string(),
        );
    }
    let matcher = compile(suffix)?;

    let mut paths = Vec::new();
    for entry in WalkDir::new(&real)
        .max_depth(SEARCH_MAX_DEPTH)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| e.to_string())?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = entry.path().strip_prefix(&real).ok().and_then(Path::to_str) else {
            continue;
        };
        if matcher.is_match(to_unix_like_path(relative)) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Compile the wildcard suffix, matched against slash separated paths
/// relative to the scan root. `*` and `?` stay within one segment and `**`
/// crosses segments. A trailing `/` matches everything below it.
fn compile(suffix: &str) -> Result<GlobMatcher, String> {
    let pattern = normalize_recursive(suffix);
    let glob = GlobBuilder::new(&pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| e.to_string())?;
    Ok(glob.compile_matcher())
}

/// Rewrite `**` that is not a whole segment: `**.xml` becomes `**/*.xml`
/// and `a**` becomes `a*`.
fn normalize_recursive(suffix: &str) -> String {
    let mut pattern = String::with_capacity(suffix.len() + 3);
    let mut rest = suffix;
    while let Some(i) = rest.find("**") {
        pattern.push_str(&rest[..i]);
        rest = &rest[i + 2..];
        let segment_start = pattern.is_empty() || pattern.ends_with('/');
        let segment_end = rest.is_empty() || rest.starts_with('/');
        match (segment_start, segment_end) {
            (true, true) => pattern.push_str("**"),
            (true, false) => pattern.push_str("**/*"),
            (false, _) => pattern.push('*'),
        }
    }
    pattern.push_str(rest);
    if pattern.ends_with('/') {
        pattern.push_str("**");
    }
    pattern
}

/// Scan with errors logged rather than collected.
pub fn scan(base: &Path, pattern: &str) -> Vec<PathBuf> {
    WildcardScanner::new(pattern).scan(base, |message| {
        error!("Failed to get JaCoCo report paths: {message}");
    })
}
