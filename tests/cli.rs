mod common;

use common::Project;
use covmap::cli::{self, Format};

#[test]
fn import_then_query() {
    let project = Project::new();
    project.source("src/main/java/org/example/Library.java", "package org.example;", 10);
    project.write("target/site/jacoco/jacoco.xml", include_str!("fixtures/module.xml"));
    let config = project.config("");

    let (mut conn, _dir, _) = common::setup_db();
    let out = cli::cmd_import(&mut conn, &config).unwrap();
    assert!(out.starts_with("Imported coverage for 1 file(s) from 1 report(s)\n"));
    assert!(out.contains("Unresolved files:   3\n"));

    let files = cli::cmd_files(&conn, false, Format::Text).unwrap();
    assert!(files.contains("src/main/java/org/example/Library.java"));
    assert!(files.contains("100.0%"));

    let json: serde_json::Value =
        serde_json::from_str(&cli::cmd_files(&conn, true, Format::Json).unwrap()).unwrap();
    assert_eq!(json[0]["total_branches"], 2);
    assert_eq!(json[0]["covered_branches"], 1);

    let lines = cli::cmd_lines(&conn, "src/main/java/org/example/Library.java").unwrap();
    let rows: Vec<_> = lines.lines().map(|l| l.split_whitespace().collect::<Vec<_>>()).collect();
    assert_eq!(rows[0], vec!["LINE", "HITS", "BRANCHES"]);
    assert_eq!(rows[1], vec!["5", "1/2"]);
    assert_eq!(rows[2], vec!["6", "1"]);

    assert!(cli::cmd_lines(&conn, "src/Unknown.java").is_err());
}

#[test]
fn files_on_empty_database() {
    let (conn, _dir, _) = common::setup_db();
    assert_eq!(
        cli::cmd_files(&conn, false, Format::Text).unwrap(),
        "No coverage in database.\n"
    );
}

#[test]
fn locate_reports_misses() {
    let project = Project::new();
    project.source("src/org/example/App.java", "package org.example;", 2);
    let config = project.config("");

    assert_eq!(
        cli::cmd_locate(&config, None, "org/example", "App.java").unwrap(),
        "src/org/example/App.java\n"
    );
    assert_eq!(
        cli::cmd_locate(&config, None, "org/other", "App.java").unwrap(),
        "No source file found for org/other/App.java\n"
    );
    assert_eq!(
        cli::cmd_locate(&config, None, "", "Nope.java").unwrap(),
        "No source file found for Nope.java\n"
    );
}

#[test]
fn scan_lists_matches_and_errors() {
    let project = Project::new();
    let a = project.write("build/a/jacoco.xml", "<report/>");
    let b = project.write("build/b/jacoco.xml", "<report/>");

    let out = cli::cmd_scan(project.root(), &["build/**/jacoco.xml".to_string()]).unwrap();
    assert_eq!(out, format!("{}\n{}\n", a.display(), b.display()));

    let out = cli::cmd_scan(std::path::Path::new("/"), &["*.xml".to_string()]).unwrap();
    assert!(out.starts_with("error: "));
}
