//! Export the imported curriculum and notes as JSON.
//!
//! Produces one document with every course, its themes, and each theme's
//! note blocks and rendered markdown, for backups or a static front end.

use anyhow::Result;
use serde::Serialize;
use sqlx::Row;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::store::{self, StoredBlock};

#[derive(Serialize)]
struct ExportData {
    courses: Vec<ExportCourse>,
}

#[derive(Serialize)]
struct ExportCourse {
    slug: String,
    title: String,
    position: i64,
    themes: Vec<ExportTheme>,
}

#[derive(Serialize)]
struct ExportTheme {
    slug: String,
    number: i64,
    title: String,
    subthemes: Vec<String>,
    position: i64,
    notes_markdown: Option<String>,
    blocks: Vec<StoredBlock>,
}

/// Export courses, themes and blocks as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let pool = db::connect(config).await?;

    let course_rows = sqlx::query("SELECT slug, title, position FROM courses ORDER BY position")
        .fetch_all(&pool)
        .await?;
    let mut courses: Vec<ExportCourse> = course_rows
        .iter()
        .map(|row| ExportCourse {
            slug: row.get("slug"),
            title: row.get("title"),
            position: row.get("position"),
            themes: Vec::new(),
        })
        .collect();

    let mut theme_count = 0usize;
    let mut block_count = 0usize;
    for summary in store::list_themes(&pool, None).await? {
        let Some(course) = courses.iter_mut().find(|c| c.slug == summary.course_slug) else {
            continue;
        };
        let notes_markdown: Option<String> =
            sqlx::query_scalar("SELECT notes_markdown FROM themes WHERE id = ?")
                .bind(&summary.id)
                .fetch_one(&pool)
                .await?;
        let blocks = store::load_blocks(&pool, &summary.id).await?;
        theme_count += 1;
        block_count += blocks.len();
        course.themes.push(ExportTheme {
            slug: summary.slug,
            number: summary.number,
            title: summary.title,
            subthemes: summary.subthemes,
            position: summary.position,
            notes_markdown,
            blocks,
        });
    }

    let course_count = courses.len();
    let data = ExportData { courses };
    let json = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!(
                "Exported {} courses, {} themes, {} blocks to {}",
                course_count,
                theme_count,
                block_count,
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }

    pool.close().await;
    Ok(())
}
