//! Kotlin package extraction.
//!
//! JaCoCo reports a Kotlin file under the package it declares, which need not
//! mirror the directory it lives in. Files the suffix tree cannot place are
//! looked up by fully-qualified name (`package.FileName.kt`) instead.

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::{debug, error};

use crate::inputs::{strip_bom, InputFile, Language};

/// Return the package declared by a Kotlin source, or `None` when the file
/// has no package header.
///
/// Only a shebang line, whitespace, comments, string literals and file
/// annotations may precede the `package` keyword; any other token ends the
/// search. Backtick-quoted segments have their backticks stripped.
pub fn extract_package(text: &str) -> Option<String> {
    let mut lexer = Lexer::new(strip_bom(text));
    lexer.skip_shebang();
    loop {
        lexer.skip_hidden();
        match lexer.peek()? {
            '@' => {
                if !lexer.skip_annotation() {
                    return None;
                }
            }
            '"' | '\'' => lexer.skip_literal(),
            c if is_ident_char(c) => {
                return if lexer.read_word() == "package" {
                    lexer.package_name()
                } else {
                    None
                };
            }
            _ => return None,
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn skip_to_line_end(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_shebang(&mut self) {
        if self.starts_with("#!") {
            self.skip_to_line_end();
        }
    }

    /// Whitespace, newlines, line comments and (nested) block comments.
    fn skip_hidden(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('/') if self.peek_at(1) == Some('/') => self.skip_to_line_end(),
                Some('/') if self.peek_at(1) == Some('*') => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        let mut depth = 1;
        while depth > 0 {
            if self.starts_with("*/") {
                depth -= 1;
                self.pos += 2;
            } else if self.starts_with("/*") {
                depth += 1;
                self.pos += 2;
            } else if self.peek().is_some() {
                self.pos += 1;
            } else {
                return;
            }
        }
    }

    /// A string (`"..."`, `"""..."""`) or character literal. Unterminated
    /// literals run to the end of the line, or of the input for raw strings.
    fn skip_literal(&mut self) {
        if self.starts_with("\"\"\"") {
            self.pos += 3;
            while self.peek().is_some() && !self.starts_with("\"\"\"") {
                self.pos += 1;
            }
            while self.peek() == Some('"') {
                self.pos += 1;
            }
            return;
        }
        let Some(quote) = self.peek() else { return };
        self.pos += 1;
        while let Some(c) = self.peek() {
            match c {
                '\\' => self.pos += 2,
                '\n' => return,
                c if c == quote => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// `@Name`, `@a.b.Name(args)`, `@file:Name(args)` or `@file:[A B(args)]`.
    /// Returns `false` when the `@` does not start an annotation.
    fn skip_annotation(&mut self) -> bool {
        self.pos += 1;
        if self.peek() == Some('[') {
            return self.skip_balanced('[', ']');
        }
        let Some(first) = self.read_identifier() else {
            return false;
        };
        if self.peek() == Some(':') && first == "file" {
            self.pos += 1;
            if self.peek() == Some('[') {
                return self.skip_balanced('[', ']');
            }
            if self.read_identifier().is_none() {
                return false;
            }
        }
        while self.peek() == Some('.') {
            self.pos += 1;
            if self.read_identifier().is_none() {
                return false;
            }
        }
        if self.peek() == Some('<') && !self.skip_balanced('<', '>') {
            return false;
        }
        if self.peek() == Some('(') {
            return self.skip_balanced('(', ')');
        }
        true
    }

    /// Skip a bracketed group; strings and comments inside are opaque.
    fn skip_balanced(&mut self, open: char, close: char) -> bool {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return false,
                Some('"') | Some('\'') => self.skip_literal(),
                Some('/') if matches!(self.peek_at(1), Some('/') | Some('*')) => self.skip_hidden(),
                Some(c) if c == open => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(c) if c == close => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return true;
                    }
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// A plain identifier or a backtick-quoted one (backticks stripped).
    fn read_identifier(&mut self) -> Option<String> {
        match self.peek()? {
            '`' => {
                let start = self.pos + 1;
                let mut end = start;
                loop {
                    match self.chars.get(end) {
                        Some('`') if end > start => break,
                        Some('`') | Some('\n') | Some('\r') | None => return None,
                        Some(_) => end += 1,
                    }
                }
                self.pos = end + 1;
                Some(self.chars[start..end].iter().collect())
            }
            c if is_ident_char(c) => Some(self.read_word()),
            _ => None,
        }
    }

    /// The dotted name after `package`. A trailing dot is not part of it.
    fn package_name(&mut self) -> Option<String> {
        self.skip_hidden();
        let mut parts = vec![self.read_identifier()?];
        loop {
            let mark = self.pos;
            self.skip_hidden();
            if self.peek() == Some('.') {
                self.pos += 1;
                self.skip_hidden();
                if let Some(part) = self.read_identifier() {
                    parts.push(part);
                    continue;
                }
            }
            self.pos = mark;
            break;
        }
        Some(parts.join("."))
    }
}

/// Lazily built map from `package.FileName.kt` to an index into the
/// resolver's file list. Built on first use and never rebuilt.
#[derive(Debug, Default)]
pub struct KotlinFileIndex {
    by_fqn: OnceLock<HashMap<String, usize>>,
}

impl KotlinFileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the Kotlin file reported under `package_path` (slash
    /// separated) and `file_name`.
    pub fn lookup(
        &self,
        files: &[InputFile],
        package_path: &str,
        file_name: &str,
    ) -> Option<usize> {
        let fqn = if package_path.is_empty() {
            file_name.to_string()
        } else {
            format!("{}.{}", package_path.replace('/', "."), file_name)
        };
        self.get_or_build(files).get(&fqn).copied()
    }

    pub fn get_or_build(&self, files: &[InputFile]) -> &HashMap<String, usize> {
        self.by_fqn.get_or_init(|| build_index(files))
    }
}

fn build_index(files: &[InputFile]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, file) in files.iter().enumerate() {
        if file.language() != Language::Kotlin {
            continue;
        }
        let text = match file.contents() {
            Ok(text) => text,
            Err(err) => {
                error!(file = %file, "Failed to read Kotlin file: {err}");
                continue;
            }
        };
        if let Some(package) = extract_package(&text) {
            map.insert(format!("{}.{}", package, file.filename()), idx);
        }
    }
    debug!(count = map.len(), "Indexed Kotlin files by package");
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(text: &str) -> Option<String> {
        extract_package(text)
    }

    #[test]
    fn test_simple_package() {
        assert_eq!(pkg("package a.b.c"), Some("a.b.c".into()));
        assert_eq!(pkg("package a.b.c\n\nclass Foo"), Some("a.b.c".into()));
        assert_eq!(pkg("package a"), Some("a".into()));
    }

    #[test]
    fn test_no_package() {
        assert_eq!(pkg(""), None);
        assert_eq!(pkg("class Foo"), None);
        assert_eq!(pkg("import a.b.c\npackage x.y"), None);
        assert_eq!(pkg("val a = \"package a.b.c\""), None);
        assert_eq!(pkg("packagea.b.c"), None);
    }

    #[test]
    fn test_comments_before_package() {
        assert_eq!(pkg("// comment\npackage a.b.c"), Some("a.b.c".into()));
        assert_eq!(pkg("/* comment */ package a.b.c"), Some("a.b.c".into()));
        assert_eq!(pkg("/** doc\n * package x.y\n */\npackage a.b.c"), Some("a.b.c".into()));
        assert_eq!(pkg("/* outer /* inner */ package x */ package a.b.c"), Some("a.b.c".into()));
        assert_eq!(pkg("// package x.y.z"), None);
        assert_eq!(pkg("/**/// package a.b.c"), None);
    }

    #[test]
    fn test_comments_inside_declaration() {
        assert_eq!(pkg("package a./* c */b.c"), Some("a.b.c".into()));
        assert_eq!(pkg("package a // trailing\n.b.c"), Some("a.b.c".into()));
        assert_eq!(pkg("package /* x */ a . b\n  . c"), Some("a.b.c".into()));
    }

    #[test]
    fn test_trailing_dot_is_dropped() {
        assert_eq!(pkg("package a.b."), Some("a.b".into()));
        assert_eq!(pkg("package a.b.\nclass X"), Some("a.b".into()));
    }

    #[test]
    fn test_shebang() {
        assert_eq!(
            pkg("#! /env/usr/bin kotlin package x.y.z\npackage a.b.c"),
            Some("a.b.c".into())
        );
        assert_eq!(pkg("#!/usr/bin/env kotlin\n"), None);
    }

    #[test]
    fn test_file_annotations() {
        assert_eq!(
            pkg("/**/@file:SuppressWarnings(\"UNUSED\")@file:JvmName(\"hi\")package a.b.c"),
            Some("a.b.c".into())
        );
        assert_eq!(
            pkg("@file:JvmName(\"package x.y\")\npackage a.b.c"),
            Some("a.b.c".into())
        );
        assert_eq!(
            pkg("@file:[JvmName(\"Foo\") Suppress(\"A\", \"B\")]\npackage a.b.c"),
            Some("a.b.c".into())
        );
        assert_eq!(
            pkg("@file:Suppress(\"\"\"raw ) \"\"\", /* ) */ \"x\")\npackage a.b.c"),
            Some("a.b.c".into())
        );
        assert_eq!(pkg("@Target\npackage a.b.c"), Some("a.b.c".into()));
        assert_eq!(pkg("@kotlin.jvm.JvmName(\"n\") package a"), Some("a".into()));
    }

    #[test]
    fn test_unbalanced_annotation() {
        assert_eq!(pkg("@file:JvmName(\"hi\"\npackage a.b.c"), None);
        assert_eq!(pkg("@ package a"), None);
    }

    #[test]
    fn test_backtick_identifiers() {
        assert_eq!(pkg("package `a`.`b`.c"), Some("a.b.c".into()));
        assert_eq!(pkg("package a.`package`.c"), Some("a.package.c".into()));
        assert_eq!(pkg("package `my pkg`.x"), Some("my pkg.x".into()));
        assert_eq!(pkg("package a.`b\nc`"), Some("a".into()));
        assert_eq!(pkg("`package` a.b"), None);
    }

    #[test]
    fn test_byte_order_mark() {
        assert_eq!(pkg("\u{feff}package org.example\nclass A"), Some("org.example".into()));
        assert_eq!(pkg("\u{feff}// header\npackage a"), Some("a".into()));
        assert_eq!(pkg("\u{feff}"), None);
    }

    #[test]
    fn test_unicode_identifiers() {
        assert_eq!(pkg("package été.über_1"), Some("été.über_1".into()));
    }

    #[test]
    fn test_index_lookup() {
        let files = vec![
            InputFile::new("/p/src/Foo.kt", "src/Foo.kt", "m")
                .with_contents("package org.example\nclass Foo"),
            InputFile::new("/p/src/Bar.java", "src/Bar.java", "m")
                .with_contents("package org.example;"),
            InputFile::new("/p/src/NoPkg.kt", "src/NoPkg.kt", "m").with_contents("fun main() {}"),
            InputFile::new("/p/src/Bom.kt", "src/Bom.kt", "m")
                .with_contents("\u{feff}package org.bom\nclass Bom"),
            InputFile::new("/p/missing/Gone.kt", "missing/Gone.kt", "m"),
        ];
        let index = KotlinFileIndex::new();
        assert_eq!(index.lookup(&files, "org/example", "Foo.kt"), Some(0));
        assert_eq!(index.lookup(&files, "org/example", "Bar.java"), None);
        assert_eq!(index.lookup(&files, "", "NoPkg.kt"), None);
        assert_eq!(index.lookup(&files, "org", "Foo.kt"), None);
        assert_eq!(index.lookup(&files, "org/bom", "Bom.kt"), Some(3));
        assert_eq!(index.get_or_build(&files).len(), 2);
    }

    #[test]
    fn test_index_is_built_once() {
        let first = vec![InputFile::new("/a/A.kt", "A.kt", "m").with_contents("package a")];
        let index = KotlinFileIndex::new();
        assert_eq!(index.lookup(&first, "a", "A.kt"), Some(0));
        assert_eq!(index.lookup(&[], "a", "A.kt"), Some(0));
    }
}
