#![allow(dead_code)]

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a fresh temporary database, returning the connection, dir handle, and db path.
/// The caller must hold onto `TempDir` to keep the temp directory alive.
pub fn setup_db() -> (Connection, TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let conn = covmap::db::open(&db_path).unwrap();
    covmap::db::init_schema(&conn).unwrap();
    (conn, dir, db_path)
}

/// A throwaway project directory.
pub struct Project {
    _dir: TempDir,
    root: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// A source file with `lines` numbered lines.
    pub fn source(&self, rel: &str, header: &str, lines: usize) -> PathBuf {
        let mut content = String::from(header);
        for i in 1..lines {
            content.push_str(&format!("\n// {i}"));
        }
        self.write(rel, &content)
    }

    pub fn config(&self, toml: &str) -> covmap::config::Config {
        let path = self.write(covmap::config::CONFIG_FILE_NAME, toml);
        covmap::config::Config::from_file(&path).unwrap()
    }
}
