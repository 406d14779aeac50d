use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;

use crate::error::{CovmapError, Result};
use crate::import::CoverageSink;
use crate::inputs::InputFile;
use crate::model::LineMeasure;

pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = include_str!("../schema.sql");

/// Open (or create) the coverage database at the given path.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
    Ok(conn)
}

/// Ensure the schema is initialized. Safe to call on an already-initialized DB.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: u32 = conn.query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))?;
    if count == 0 {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        return Ok(());
    }
    let version: u32 = conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
        row.get(0)
    })?;
    if version != SCHEMA_VERSION {
        return Err(CovmapError::Other(format!(
            "Database schema version {} is not supported by this binary ({}). \
             Delete the database and import again.",
            version, SCHEMA_VERSION
        )));
    }
    Ok(())
}

/// Coverage sink writing into SQLite.
///
/// Measures for a file already present are merged: hits are summed and
/// branch counters keep the highest value seen.
pub struct SqliteSink<'a> {
    conn: &'a mut Connection,
}

impl<'a> SqliteSink<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }
}

impl CoverageSink for SqliteSink<'_> {
    fn save(&mut self, file: &InputFile, measures: &[LineMeasure]) -> Result<()> {
        let lines = file.line_count()?;
        let tx = self.conn.transaction()?;
        save_tx(&tx, file, measures, lines)?;
        tx.commit()?;
        Ok(())
    }
}

fn save_tx(
    tx: &Transaction,
    file: &InputFile,
    measures: &[LineMeasure],
    lines: usize,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO source_file (path, module, imported_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(path) DO UPDATE SET module = excluded.module, imported_at = excluded.imported_at",
        params![file.relative_path(), file.module(), now],
    )?;
    let file_id: i64 = tx.query_row(
        "SELECT id FROM source_file WHERE path = ?1",
        params![file.relative_path()],
        |row| row.get(0),
    )?;

    // A stored line keeps the kind of the measure saved last.
    let mut hits_stmt = tx.prepare_cached(
        "INSERT INTO line_coverage (source_file_id, line_number, hits) VALUES (?1, ?2, ?3)
         ON CONFLICT(source_file_id, line_number)
         DO UPDATE SET hits = COALESCE(hits, 0) + excluded.hits,
                       branches_total = NULL,
                       branches_covered = NULL",
    )?;
    let mut cond_stmt = tx.prepare_cached(
        "INSERT INTO line_coverage (source_file_id, line_number, branches_total, branches_covered)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(source_file_id, line_number)
         DO UPDATE SET
             branches_total = MAX(COALESCE(branches_total, 0), excluded.branches_total),
             branches_covered = MAX(COALESCE(branches_covered, 0), excluded.branches_covered),
             hits = NULL",
    )?;

    for measure in measures {
        let line = measure.line();
        if line == 0 || line as usize > lines {
            return Err(CovmapError::LineOutOfRange {
                path: file.path().to_path_buf(),
                line,
                lines,
            });
        }
        match *measure {
            LineMeasure::Hits { line, hits } => {
                hits_stmt.execute(params![file_id, line, hits])?;
            }
            LineMeasure::Conditions { line, total, covered } => {
                cond_stmt.execute(params![file_id, line, total, covered])?;
            }
        }
    }
    Ok(())
}

// ── Query helpers ──────────────────────────────────────────────────────────

/// Per-file summary row.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FileSummary {
    pub path: String,
    pub module: String,
    pub imported_at: String,
    pub total_lines: u64,
    pub covered_lines: u64,
    pub total_branches: u64,
    pub covered_branches: u64,
}

impl FileSummary {
    /// Lines with hits or any covered branch, over all measured lines.
    pub fn line_rate(&self) -> f64 {
        if self.total_lines == 0 {
            return 0.0;
        }
        self.covered_lines as f64 / self.total_lines as f64
    }

    pub fn branch_rate(&self) -> f64 {
        if self.total_branches == 0 {
            return 0.0;
        }
        self.covered_branches as f64 / self.total_branches as f64
    }
}

pub fn get_files(conn: &Connection) -> Result<Vec<FileSummary>> {
    let mut stmt = conn.prepare(
        "SELECT sf.path,
                sf.module,
                sf.imported_at,
                COUNT(lc.line_number),
                COALESCE(SUM(CASE WHEN lc.hits > 0 OR lc.branches_covered > 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(lc.branches_total), 0),
                COALESCE(SUM(lc.branches_covered), 0)
         FROM source_file sf
         LEFT JOIN line_coverage lc ON lc.source_file_id = sf.id
         GROUP BY sf.id
         ORDER BY sf.path",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(FileSummary {
            path: row.get(0)?,
            module: row.get(1)?,
            imported_at: row.get(2)?,
            total_lines: row.get(3)?,
            covered_lines: row.get(4)?,
            total_branches: row.get(5)?,
            covered_branches: row.get(6)?,
        })
    })?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row?);
    }
    Ok(result)
}

/// Line-level detail for a source file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LineDetail {
    pub line_number: u32,
    pub hits: Option<u32>,
    pub branches_total: Option<u32>,
    pub branches_covered: Option<u32>,
}

pub fn get_lines(conn: &Connection, source_path: &str) -> Result<Vec<LineDetail>> {
    let source_file_id: i64 = conn
        .query_row(
            "SELECT id FROM source_file WHERE path = ?1",
            params![source_path],
            |row| row.get(0),
        )
        .map_err(|_| CovmapError::Other(format!("Source file not found: {}", source_path)))?;

    let mut stmt = conn.prepare(
        "SELECT line_number, hits, branches_total, branches_covered FROM line_coverage
         WHERE source_file_id = ?1
         ORDER BY line_number",
    )?;

    let rows = stmt.query_map(params![source_file_id], |row| {
        Ok(LineDetail {
            line_number: row.get(0)?,
            hits: row.get(1)?,
            branches_total: row.get(2)?,
            branches_covered: row.get(3)?,
        })
    })?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row?);
    }
    Ok(result)
}
