//! Suffix index over relative source paths.
//!
//! Files are inserted keyed by their path segments walked from the file name
//! back to the first directory, so a report path that lacks its source-root
//! prefix (`org/example/App.java` instead of
//! `app/src/main/java/org/example/App.java`) still lands on the right node.

use std::collections::HashMap;

#[derive(Debug)]
struct Node<T> {
    children: HashMap<String, Node<T>>,
    /// Key of the first child ever inserted; picked when a lookup has to
    /// choose a leaf without more context.
    first_child: Option<String>,
    file: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            first_child: None,
            file: None,
        }
    }
}

impl<T> Node<T> {
    fn child_or_insert(&mut self, segment: &str) -> &mut Node<T> {
        if self.first_child.is_none() {
            self.first_child = Some(segment.to_string());
        }
        self.children.entry(segment.to_string()).or_default()
    }

    fn only_child(&self) -> Option<&Node<T>> {
        if self.children.len() == 1 {
            self.children.values().next()
        } else {
            None
        }
    }

    fn first(&self) -> Option<&Node<T>> {
        self.first_child.as_ref().and_then(|key| self.children.get(key))
    }
}

/// A trie of path segments, rooted at the file name.
///
/// `T` is whatever handle the caller uses for a file; the resolver stores
/// indices into its own file list.
#[derive(Debug)]
pub struct ReversePathTree<T> {
    root: Node<T>,
    len: usize,
}

impl<T> Default for ReversePathTree<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }
}

impl<T: Copy> ReversePathTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `index` calls that stored a file.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `file` under its full relative path. Indexing the same path
    /// twice replaces the earlier file. Empty paths are ignored.
    pub fn index<S: AsRef<str>>(&mut self, file: T, path: &[S]) {
        if path.is_empty() {
            return;
        }
        let mut node = &mut self.root;
        for segment in path.iter().rev() {
            node = node.child_or_insert(segment.as_ref());
        }
        node.file = Some(file);
        self.len += 1;
    }

    /// Find the file whose path ends with `path`.
    ///
    /// When several indexed paths share the suffix, the leaf reached by
    /// always following the first-inserted child wins.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<T> {
        let mut node = self.walk(path)?;
        while let Some(next) = node.first() {
            node = next;
        }
        node.file
    }

    /// Like [`lookup`](Self::lookup), but when the suffix is ambiguous the
    /// first branching point is settled by picking the child segment equal
    /// to `module`. Returns `None` when no child matches, or when the path
    /// branches again below the chosen module directory.
    pub fn lookup_in_module<S: AsRef<str>>(&self, module: &str, path: &[S]) -> Option<T> {
        let mut node = self.walk(path)?;
        loop {
            if node.children.is_empty() {
                return node.file;
            }
            if let Some(next) = node.only_child() {
                node = next;
                continue;
            }
            let mut chosen = node.children.get(module)?;
            while !chosen.children.is_empty() {
                chosen = chosen.only_child()?;
            }
            return chosen.file;
        }
    }

    fn walk<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node<T>> {
        if path.is_empty() {
            return None;
        }
        let mut node = &self.root;
        for segment in path.iter().rev() {
            node = node.children.get(segment.as_ref())?;
        }
        Some(node)
    }
}

/// Split a slash (or backslash) separated path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(paths: &[&str]) -> ReversePathTree<usize> {
        let mut tree = ReversePathTree::new();
        for (i, p) in paths.iter().enumerate() {
            tree.index(i, &split_path(p));
        }
        tree
    }

    #[test]
    fn test_exact_and_suffix_lookup() {
        let tree = tree(&["module/src/main/java/org/example/App.java"]);
        assert_eq!(tree.lookup(&split_path("module/src/main/java/org/example/App.java")), Some(0));
        assert_eq!(tree.lookup(&split_path("org/example/App.java")), Some(0));
        assert_eq!(tree.lookup(&["App.java"]), Some(0));
        assert_eq!(tree.lookup(&split_path("org/other/App.java")), None);
        let foreign = split_path("other/module/src/main/java/org/example/App.java");
        assert_eq!(tree.lookup(&foreign), None);
    }

    #[test]
    fn test_first_inserted_wins_on_ambiguity() {
        let tree = tree(&[
            "src/main/java/org/sonar/test/File.java",
            "src/test/java/org/sonar/test/File.java",
        ]);
        assert_eq!(tree.lookup(&split_path("org/sonar/test/File.java")), Some(0));
        assert_eq!(tree.lookup(&split_path("test/java/org/sonar/test/File.java")), Some(1));
    }

    #[test]
    fn test_reindexing_same_path_overwrites() {
        let mut tree = ReversePathTree::new();
        tree.index(1, &["a", "B.java"]);
        tree.index(2, &["a", "B.java"]);
        assert_eq!(tree.lookup(&["B.java"]), Some(2));
    }

    #[test]
    fn test_empty_path_is_ignored() {
        let mut tree: ReversePathTree<usize> = ReversePathTree::new();
        tree.index(1, &[] as &[&str]);
        assert!(tree.is_empty());
        assert_eq!(tree.lookup(&[] as &[&str]), None);
    }

    #[test]
    fn test_module_resolves_name_clash() {
        let tree = tree(&[
            "module-clash/src/main/java/org/example/App.java",
            "module/src/main/java/org/example/App.java",
        ]);
        let suffix = split_path("org/example/App.java");
        assert_eq!(tree.lookup_in_module("module", &suffix), Some(1));
        assert_eq!(tree.lookup_in_module("module-clash", &suffix), Some(0));
    }

    #[test]
    fn test_module_lookup_on_empty_tree() {
        let tree: ReversePathTree<usize> = ReversePathTree::new();
        assert_eq!(
            tree.lookup_in_module("my-module", &split_path("src/main/java/org/example/App.java")),
            None
        );
    }

    #[test]
    fn test_module_lookup_without_matching_module() {
        let tree = tree(&[
            "module-clash/src/main/java/org/example/App.java",
            "module-clash-again/src/main/java/org/example/App.java",
        ]);
        assert_eq!(
            tree.lookup_in_module("my-module", &split_path("src/main/java/org/example/App.java")),
            None
        );
    }

    #[test]
    fn test_module_lookup_of_missing_file() {
        let tree = tree(&["module-clash/src/main/java/org/example/App.java"]);
        assert_eq!(
            tree.lookup_in_module("my-module", &split_path("src/main/java/org/example/Other.java")),
            None
        );
    }

    #[test]
    fn test_module_lookup_of_unambiguous_file() {
        let tree = tree(&["module/src/main/java/org/example/App.java"]);
        assert_eq!(tree.lookup_in_module("any", &split_path("org/example/App.java")), Some(0));
    }

    #[test]
    fn test_module_lookup_descends_below_module_directory() {
        let tree = tree(&[
            "nested/library/src/main/java/org/example/Library.java",
            "other/src/main/java/org/example/Library.java",
        ]);
        let suffix = split_path("org/example/Library.java");
        assert_eq!(tree.lookup_in_module("library", &suffix), Some(0));
        assert_eq!(tree.lookup_in_module("other", &suffix), Some(1));
    }

    #[test]
    fn test_module_lookup_gives_up_on_deeper_ambiguity() {
        let tree = tree(&[
            "a/lib/src/org/X.java",
            "b/lib/src/org/X.java",
            "c/src/org/X.java",
        ]);
        assert_eq!(tree.lookup_in_module("lib", &split_path("org/X.java")), None);
        assert_eq!(tree.lookup_in_module("c", &split_path("org/X.java")), Some(2));
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("org/example/App.java"), vec!["org", "example", "App.java"]);
        assert_eq!(split_path("/abs\\win/App.java"), vec!["abs", "win", "App.java"]);
        assert!(split_path("").is_empty());
    }
}
