use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use covmap::cli::{self, Format};
use covmap::config::Config;
use covmap::db;

/// covmap: map JaCoCo XML coverage reports onto project source files.
#[derive(Parser)]
#[command(name = "covmap", version, about)]
struct Cli {
    /// Path to the SQLite database (default: ./.covmap.db)
    #[arg(long, global = true, default_value = ".covmap.db")]
    db: PathBuf,

    /// Config file (default: ./covmap.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project directory used when no config file is given.
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the configured (or default) per-module reports.
    Import,

    /// Import the aggregate report, using its groups to tell modules apart.
    Aggregate,

    /// Parse a report and print what it contains.
    Parse {
        /// Path to the JaCoCo XML report.
        report: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Resolve a report entry to a source file.
    Locate {
        /// Slash separated package, e.g. org/example (empty for the default package).
        package: String,

        /// File name as reported, e.g. App.java.
        file: String,

        /// Report group (module name) used to disambiguate.
        #[arg(long)]
        group: Option<String>,
    },

    /// List the files matched by report path patterns.
    Scan {
        /// Patterns, e.g. "**/jacoco*.xml".
        #[arg(required = true)]
        patterns: Vec<String>,
    },

    /// Print the package declared by a Kotlin source file.
    Package {
        source: PathBuf,
    },

    /// List per-file coverage stored in the database.
    Files {
        /// Sort by coverage rate ascending (show worst files first).
        #[arg(long)]
        sort_by_coverage: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show line-level coverage for a source file.
    Lines {
        /// The source file path, relative to the project base directory.
        source_file: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let out = match &cli.command {
        Commands::Import => {
            let config = load_config(&cli)?;
            let mut conn = open_db(&cli)?;
            cli::cmd_import(&mut conn, &config)?
        }
        Commands::Aggregate => {
            let config = load_config(&cli)?;
            let mut conn = open_db(&cli)?;
            cli::cmd_aggregate(&mut conn, &config)?
        }
        Commands::Parse { report, format } => cli::cmd_parse(report, *format)?,
        Commands::Locate {
            package,
            file,
            group,
        } => {
            let config = load_config(&cli)?;
            cli::cmd_locate(&config, group.as_deref(), package, file)?
        }
        Commands::Scan { patterns } => {
            let config = load_config(&cli)?;
            cli::cmd_scan(&config.base_dir(), patterns)?
        }
        Commands::Package { source } => cli::cmd_package(source)?,
        Commands::Files {
            sort_by_coverage,
            format,
        } => {
            let conn = open_db(&cli)?;
            cli::cmd_files(&conn, *sort_by_coverage, *format)?
        }
        Commands::Lines { source_file } => {
            let conn = open_db(&cli)?;
            cli::cmd_lines(&conn, source_file)?
        }
    };
    print!("{}", out);
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load(cli.config.as_deref(), &cli.dir).context("Failed to load configuration")
}

fn open_db(cli: &Cli) -> Result<rusqlite::Connection> {
    let conn = db::open(&cli.db).context("Failed to open database")?;
    db::init_schema(&conn).context("Failed to initialize schema")?;
    Ok(conn)
}
