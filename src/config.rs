//! `covmap.toml` loading.
//!
//! ```toml
//! project_key = "org.example:shop"
//! report_paths = ["**/jacoco.xml"]
//! aggregate_report_path = "report/target/site/jacoco-aggregate/jacoco.xml"
//!
//! [[modules]]
//! key = "org.example:library"
//! base_dir = "nested/library"
//! sources = ["src/main/java"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CovmapError, Result};
use crate::module::{module_name, normalize, ModuleCoverageContext, ProjectCoverageIndex};

pub const CONFIG_FILE_NAME: &str = "covmap.toml";

/// Report locations probed when no `report_paths` are configured.
pub const DEFAULT_REPORT_PATHS: &[&str] = &[
    "target/site/jacoco/jacoco.xml",
    "target/site/jacoco-it/jacoco.xml",
    "build/reports/jacoco/test/jacocoTestReport.xml",
];

const DEFAULT_SOURCES: &[&str] = &["src"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub project_key: Option<String>,
    pub module_key: Option<String>,
    pub project_base_dir: Option<PathBuf>,
    /// Source roots of the project when no `[[modules]]` are declared.
    pub sources: Vec<PathBuf>,
    /// Report path patterns; `*`, `**` and `?` are accepted.
    pub report_paths: Vec<String>,
    pub aggregate_report_path: Option<String>,
    pub modules: Vec<ModuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    pub key: String,
    /// Relative to the project base directory; defaults to the module name.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// Relative to the module base directory, or absolute.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

impl std::str::FromStr for Config {
    type Err = CovmapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        toml::from_str(s).map_err(|e| CovmapError::Config(e.to_string()))
    }
}

impl Config {
    /// Load a config file. A relative (or missing) `project_base_dir` is
    /// resolved against the directory holding the file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = content.parse()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let dir = absolute(dir)?;
        config.project_base_dir = Some(match config.project_base_dir.take() {
            Some(base) if base.is_absolute() => normalize(&base),
            Some(base) => normalize(&dir.join(base)),
            None => dir,
        });
        Ok(config)
    }

    /// Load `explicit` if given, else `covmap.toml` in `dir` if present,
    /// else defaults rooted at `dir`.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Self::from_file(&candidate);
        }
        Ok(Config {
            project_base_dir: Some(absolute(dir)?),
            ..Default::default()
        })
    }

    pub fn base_dir(&self) -> PathBuf {
        self.project_base_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Name of the module being analyzed in single-module mode: derived from
    /// `module_key`, else `project_key`, else the base directory name.
    pub fn module_name(&self) -> String {
        if let Some(key) = self.module_key.as_deref().or(self.project_key.as_deref()) {
            return module_name(key).to_string();
        }
        self.base_dir()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("project")
            .to_string()
    }

    pub fn module_contexts(&self) -> Vec<ModuleCoverageContext> {
        let base = self.base_dir();
        if self.modules.is_empty() {
            return vec![ModuleCoverageContext::new(
                self.module_name(),
                base,
                sources_or_default(&self.sources),
            )];
        }
        self.modules
            .iter()
            .map(|m| {
                let name = module_name(&m.key).to_string();
                let module_base = match &m.base_dir {
                    Some(dir) if dir.is_absolute() => dir.clone(),
                    Some(dir) => base.join(dir),
                    None => base.join(&name),
                };
                ModuleCoverageContext::new(name, module_base, sources_or_default(&m.sources))
            })
            .collect()
    }

    pub fn project_index(&self) -> ProjectCoverageIndex {
        ProjectCoverageIndex::with_modules(self.base_dir(), self.module_contexts())
    }
}

fn sources_or_default(sources: &[PathBuf]) -> Vec<PathBuf> {
    if sources.is_empty() {
        DEFAULT_SOURCES.iter().map(PathBuf::from).collect()
    } else {
        sources.to_vec()
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}
