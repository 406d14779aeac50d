//! Mapping of report entries (`group`, package path, file name) to indexed
//! source files.

use std::path::Path;

use tracing::{debug, trace};

use crate::inputs::InputFile;
use crate::kotlin::KotlinFileIndex;
use crate::module::ProjectCoverageIndex;
use crate::tree::{split_path, ReversePathTree};

/// How a `package/File` path is looked up in the suffix tree, given the
/// report group it came from.
pub trait LookupStrategy {
    fn lookup(
        &self,
        tree: &ReversePathTree<usize>,
        group: Option<&str>,
        file_path: &str,
    ) -> Option<usize>;
}

/// Plain suffix lookup; the report group is ignored. Used when a report
/// covers a single module.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleLookup;

impl LookupStrategy for ModuleLookup {
    fn lookup(
        &self,
        tree: &ReversePathTree<usize>,
        _group: Option<&str>,
        file_path: &str,
    ) -> Option<usize> {
        tree.lookup(&split_path(file_path))
    }
}

/// Lookup for aggregate reports, where each `<group>` names the module its
/// files belong to.
#[derive(Debug, Clone, Default)]
pub struct ProjectLookup {
    index: ProjectCoverageIndex,
}

impl ProjectLookup {
    pub fn new(index: ProjectCoverageIndex) -> Self {
        Self { index }
    }

    /// Rebuild the full path from the source roots of every module named
    /// `group` and look that up instead.
    fn lookup_in_sources(
        &self,
        tree: &ReversePathTree<usize>,
        group: &str,
        file_path: &str,
    ) -> Option<usize> {
        let relative = Path::new(file_path);
        for module in self.index.modules_named(group) {
            for source in &module.sources {
                let candidate = if source.is_dir() {
                    source.join(relative)
                } else if source.ends_with(relative) {
                    source.clone()
                } else {
                    continue;
                };
                let Some(segments) = self.index.relative_segments(&candidate) else {
                    trace!(
                        candidate = %candidate.display(),
                        "Candidate outside of project base directory"
                    );
                    continue;
                };
                if let Some(found) = tree.lookup(&segments) {
                    return Some(found);
                }
            }
        }
        None
    }
}

impl LookupStrategy for ProjectLookup {
    fn lookup(
        &self,
        tree: &ReversePathTree<usize>,
        group: Option<&str>,
        file_path: &str,
    ) -> Option<usize> {
        let Some(group) = group else {
            return tree.lookup(&split_path(file_path));
        };
        tree.lookup_in_module(group, &split_path(file_path))
            .or_else(|| self.lookup_in_sources(tree, group, file_path))
    }
}

/// Resolves report entries against a fixed set of input files.
///
/// Safe to share between threads once built: the only mutable state is the
/// Kotlin index, which is computed once on first use.
#[derive(Debug)]
pub struct FileResolver<S = ModuleLookup> {
    files: Vec<InputFile>,
    tree: ReversePathTree<usize>,
    strategy: S,
    kotlin: KotlinFileIndex,
}

impl FileResolver<ModuleLookup> {
    pub fn new(files: Vec<InputFile>) -> Self {
        Self::with_strategy(files, ModuleLookup)
    }
}

impl FileResolver<ProjectLookup> {
    pub fn for_project(files: Vec<InputFile>, index: ProjectCoverageIndex) -> Self {
        Self::with_strategy(files, ProjectLookup::new(index))
    }
}

impl<S: LookupStrategy> FileResolver<S> {
    pub fn with_strategy(files: Vec<InputFile>, strategy: S) -> Self {
        let mut tree = ReversePathTree::new();
        for (idx, file) in files.iter().enumerate() {
            tree.index(idx, &file.segments());
        }
        debug!(files = files.len(), "Indexed input files");
        Self {
            files,
            tree,
            strategy,
            kotlin: KotlinFileIndex::new(),
        }
    }

    /// Find the input file for a report's `sourcefile` entry.
    ///
    /// `package_path` is slash separated (`org/example`), possibly empty.
    /// Kotlin files whose directory does not mirror their package are found
    /// through their declared package.
    pub fn resolve(
        &self,
        group: Option<&str>,
        package_path: &str,
        file_name: &str,
    ) -> Option<&InputFile> {
        let file_path = if package_path.is_empty() {
            file_name.to_string()
        } else {
            format!("{package_path}/{file_name}")
        };
        let found = self
            .strategy
            .lookup(&self.tree, group, &file_path)
            .or_else(|| {
                if file_name.ends_with(".kt") {
                    self.kotlin.lookup(&self.files, package_path, file_name)
                } else {
                    None
                }
            });
        found.and_then(|idx| self.files.get(idx))
    }
}
