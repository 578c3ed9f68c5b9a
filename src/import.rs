//! Import orchestration.
//!
//! Coordinates the two one-shot import flows:
//!
//! - **curriculum**: syllabus PDF → text → parsed tree → courses/themes
//!   upserted by slug, absent ones removed;
//! - **notes**: manuscript DOCX + persisted theme lookups → note blocks →
//!   images stored → blocks and rendered markdown upserted per theme.
//!
//! Extraction errors abort the run. Unmatched headings and images missing
//! from the package are reported as warnings and listed in the summary.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::curriculum::parse_curriculum_text;
use crate::db;
use crate::extract::{extract_curriculum_from_pdf, extract_notes_from_docx};
use crate::markdown::blocks_to_markdown;
use crate::models::{NoteExtraction, ParsedCurriculum};
use crate::pdf::extractor_from_config;
use crate::progress::{ImportProgressEvent, ImportProgressReporter};
use crate::storage::{FsImageStore, ImageStore};
use crate::store;

/// Totals of one notes import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotesImportSummary {
    pub themes_written: u64,
    pub blocks_written: u64,
    pub blocks_removed: u64,
    pub images_stored: u64,
    pub unmatched_headings: Vec<String>,
    pub missing_images: Vec<String>,
}

/// Read the syllabus as text. `.txt` input is taken as already extracted.
pub fn read_curriculum(config: &Config, input: &Path) -> Result<ParsedCurriculum> {
    let rules = config.curriculum.parser_rules();
    let is_text = input
        .extension()
        .map(|e| e.eq_ignore_ascii_case("txt"))
        .unwrap_or(false);

    if is_text {
        let text = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read syllabus text: {}", input.display()))?;
        return Ok(parse_curriculum_text(&text, &rules));
    }

    let extractor = extractor_from_config(&config.pdf);
    let parsed = extract_curriculum_from_pdf(input, extractor.as_ref(), &rules)
        .with_context(|| format!("Failed to extract syllabus: {}", input.display()))?;
    Ok(parsed)
}

pub async fn run_import_curriculum(
    config: &Config,
    input: &Path,
    dry_run: bool,
    progress: &dyn ImportProgressReporter,
) -> Result<()> {
    progress.report(ImportProgressEvent::Extracting {
        input: input.display().to_string(),
    });
    let parsed = read_curriculum(config, input)?;

    if parsed.courses.is_empty() {
        bail!(
            "No courses found in {}. Check [curriculum].course_titles against the syllabus headings.",
            input.display()
        );
    }
    for course in &parsed.courses {
        if course.themes.is_empty() {
            progress.report(ImportProgressEvent::Warning {
                message: format!("course '{}' has no themes", course.title),
            });
        }
    }

    if dry_run {
        println!("import curriculum (dry-run)");
        for course in &parsed.courses {
            println!("  {} ({} themes)", course.title, course.themes.len());
        }
        println!("  courses found: {}", parsed.courses.len());
        println!("  themes found: {}", parsed.theme_count());
        return Ok(());
    }

    let pool = db::connect(config).await?;
    progress.report(ImportProgressEvent::Writing {
        what: "themes",
        n: 0,
        total: parsed.theme_count() as u64,
    });
    let stats = store::upsert_curriculum(&pool, &parsed).await?;
    progress.report(ImportProgressEvent::Writing {
        what: "themes",
        n: stats.themes_upserted,
        total: parsed.theme_count() as u64,
    });

    println!("import curriculum");
    println!("  upserted courses: {}", stats.courses_upserted);
    println!("  upserted themes: {}", stats.themes_upserted);
    println!("  removed courses: {}", stats.courses_removed);
    println!("  removed themes: {}", stats.themes_removed);
    println!("ok");

    pool.close().await;
    Ok(())
}

pub async fn run_import_notes(
    config: &Config,
    input: &Path,
    dry_run: bool,
    progress: &dyn ImportProgressReporter,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let lookups = store::load_theme_lookups(&pool).await?;
    if lookups.is_empty() {
        pool.close().await;
        bail!("No themes in the database. Run `studyhall import curriculum` first.");
    }

    progress.report(ImportProgressEvent::Extracting {
        input: input.display().to_string(),
    });
    let extraction = extract_notes_from_docx(input, lookups)
        .await
        .with_context(|| format!("Failed to extract notes: {}", input.display()))?;

    for heading in &extraction.unmatched_headings {
        progress.report(ImportProgressEvent::Warning {
            message: format!("unmatched heading: {}", heading),
        });
    }
    for target in &extraction.missing_images {
        progress.report(ImportProgressEvent::Warning {
            message: format!("image missing from package: {}", target),
        });
    }

    if dry_run {
        println!("import notes (dry-run)");
        println!("  themes with notes: {}", extraction.blocks_by_theme.len());
        println!("  blocks found: {}", extraction.block_count());
        println!("  images found: {}", extraction.image_bytes_by_target.len());
        print_unmatched(&extraction.unmatched_headings);
        print_missing_images(&extraction.missing_images);
        pool.close().await;
        return Ok(());
    }

    let images = FsImageStore::from_config(&config.storage);
    let summary = import_notes(&pool, &images, &extraction, progress).await?;

    println!("import notes");
    println!("  themes written: {}", summary.themes_written);
    println!("  blocks written: {}", summary.blocks_written);
    println!("  blocks removed: {}", summary.blocks_removed);
    println!("  images stored: {}", summary.images_stored);
    print_unmatched(&summary.unmatched_headings);
    print_missing_images(&summary.missing_images);
    println!("ok");

    pool.close().await;
    Ok(())
}

fn print_unmatched(headings: &[String]) {
    println!("  unmatched headings: {}", headings.len());
    for heading in headings {
        println!("    - {}", heading);
    }
}

fn print_missing_images(targets: &[String]) {
    if targets.is_empty() {
        return;
    }
    println!("  missing images: {}", targets.len());
    for target in targets {
        println!("    - {}", target);
    }
}

/// Store images and write every theme's blocks from one extraction.
///
/// Images are stored sequentially, then each theme's blocks are synced in
/// its own transaction. Themes without blocks in this extraction keep what
/// they had.
pub async fn import_notes(
    pool: &SqlitePool,
    images: &dyn ImageStore,
    extraction: &NoteExtraction,
    progress: &dyn ImportProgressReporter,
) -> Result<NotesImportSummary> {
    let mut summary = NotesImportSummary {
        unmatched_headings: extraction.unmatched_headings.clone(),
        missing_images: extraction.missing_images.clone(),
        ..Default::default()
    };

    let total_images = extraction.image_bytes_by_target.len() as u64;
    let mut image_ids: HashMap<String, String> = HashMap::new();
    for (target, bytes) in &extraction.image_bytes_by_target {
        let name = target.rsplit('/').next().unwrap_or(target);
        let id = images
            .put(name, bytes)
            .await
            .with_context(|| format!("Failed to store image {}", target))?;
        store::record_image(pool, target, &id, bytes.len()).await?;
        image_ids.insert(target.clone(), id);
        summary.images_stored += 1;
        progress.report(ImportProgressEvent::StoringImages {
            n: summary.images_stored,
            total: total_images,
        });
    }

    let total_themes = extraction.blocks_by_theme.len() as u64;
    for (theme_id, blocks) in &extraction.blocks_by_theme {
        let markdown = blocks_to_markdown(blocks, |block| {
            block
                .image_target
                .as_ref()
                .and_then(|target| image_ids.get(target))
                .map(|id| images.url(id))
        });
        let stats = store::sync_theme_blocks(pool, theme_id, blocks, &image_ids, &markdown).await?;
        summary.themes_written += 1;
        summary.blocks_written += stats.written;
        summary.blocks_removed += stats.removed;
        progress.report(ImportProgressEvent::Writing {
            what: "notes",
            n: summary.themes_written,
            total: total_themes,
        });
    }

    Ok(summary)
}
