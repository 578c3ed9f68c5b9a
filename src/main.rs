//! # studyhall CLI
//!
//! The `studyhall` binary imports a study curriculum and its notes into a
//! local SQLite database and lets you inspect the result.
//!
//! ## Usage
//!
//! ```bash
//! studyhall --config ./config/studyhall.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `studyhall init` | Create the SQLite database and run schema migrations |
//! | `studyhall import curriculum <pdf>` | Parse the syllabus into courses and themes |
//! | `studyhall import notes <docx>` | Attach manuscript notes to the imported themes |
//! | `studyhall themes` | List imported themes |
//! | `studyhall show <slug>` | Print one theme with its note blocks |
//! | `studyhall export` | Dump everything as JSON |
//! | `studyhall stats` | Counts and notes coverage per course |
//!
//! ## Examples
//!
//! ```bash
//! studyhall init
//! studyhall import curriculum ./statnice.pdf --dry-run
//! studyhall import curriculum ./statnice.pdf
//! studyhall import notes ./vypracovane.docx
//! studyhall show geometria-1-kruznica --markdown
//! ```

mod assemble;
mod config;
mod curriculum;
mod db;
mod export;
mod extract;
mod import;
mod markdown;
mod migrate;
mod models;
mod normalize;
mod ooxml;
mod pdf;
mod progress;
mod resolver;
mod show;
mod stats;
mod storage;
mod store;
mod themes;
mod walker;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::progress::ProgressMode;

/// studyhall: import a study curriculum and its notes.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/studyhall.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "studyhall",
    about = "Import a study curriculum (PDF) and notes manuscript (DOCX) into a local database",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/studyhall.toml")]
    config: PathBuf,

    /// Progress reporting on stderr: `auto`, `human`, `json` or `off`.
    ///
    /// `auto` shows human progress when stderr is a terminal.
    #[arg(long, global = true, default_value = "auto")]
    progress: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. Running it
    /// again is safe.
    Init,

    /// Import the syllabus or the notes manuscript.
    Import {
        #[command(subcommand)]
        source: ImportSource,
    },

    /// List imported themes in curriculum order.
    Themes {
        /// Only list themes of this course (course slug, e.g. `geometria`).
        #[arg(long)]
        course: Option<String>,
    },

    /// Print a theme and its note blocks.
    Show {
        /// Theme slug, as listed by `studyhall themes`.
        slug: String,

        /// Print only the theme's rendered markdown.
        #[arg(long)]
        markdown: bool,
    },

    /// Export courses, themes and note blocks as JSON.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show database statistics and notes coverage.
    Stats,
}

/// Import subcommands.
#[derive(Subcommand)]
enum ImportSource {
    /// Parse a syllabus into courses and themes.
    ///
    /// Accepts the syllabus PDF, or a `.txt` file holding text already
    /// extracted from it. Courses and themes missing from the new syllabus
    /// are removed.
    Curriculum {
        /// Path to the syllabus `.pdf` (or extracted `.txt`).
        path: PathBuf,

        /// Show what would be imported without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Attach notes from a DOCX manuscript to the imported themes.
    ///
    /// Each level-2 heading is matched against the imported theme titles;
    /// the content under it becomes that theme's note blocks.
    Notes {
        /// Path to the `.docx` manuscript.
        path: PathBuf,

        /// Show what would be imported without writing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { source } => {
            let reporter = ProgressMode::from_flag(&cli.progress)?.reporter();
            match source {
                ImportSource::Curriculum { path, dry_run } => {
                    import::run_import_curriculum(&cfg, &path, dry_run, reporter.as_ref()).await?;
                }
                ImportSource::Notes { path, dry_run } => {
                    import::run_import_notes(&cfg, &path, dry_run, reporter.as_ref()).await?;
                }
            }
        }
        Commands::Themes { course } => {
            themes::run_themes(&cfg, course.as_deref()).await?;
        }
        Commands::Show { slug, markdown } => {
            show::run_show(&cfg, &slug, markdown).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
