//! Database statistics and notes coverage.
//!
//! Gives a quick summary of what has been imported: course and theme counts,
//! how many themes have notes attached, and a per-course breakdown. Used by
//! `studyhall stats` to confirm an import landed where expected.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// Per-course breakdown of themes and note coverage.
struct CourseStats {
    title: String,
    theme_count: i64,
    with_notes: i64,
    block_count: i64,
    last_update_ts: Option<i64>,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_courses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
        .fetch_one(&pool)
        .await?;
    let total_themes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM themes")
        .fetch_one(&pool)
        .await?;
    let total_blocks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM note_blocks")
        .fetch_one(&pool)
        .await?;
    let total_images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
        .fetch_one(&pool)
        .await?;
    let with_notes: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT theme_id) FROM note_blocks")
            .fetch_one(&pool)
            .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("studyhall: database stats");
    println!("=========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Courses:     {}", total_courses);
    println!("  Themes:      {}", total_themes);
    println!(
        "  With notes:  {} / {} ({}%)",
        with_notes,
        total_themes,
        percent(with_notes, total_themes)
    );
    println!("  Blocks:      {}", total_blocks);
    println!("  Images:      {}", total_images);

    let rows = sqlx::query(
        r#"
        SELECT
            c.title,
            COUNT(DISTINCT t.id) AS theme_count,
            COUNT(DISTINCT b.theme_id) AS with_notes,
            COUNT(b.id) AS block_count,
            MAX(b.updated_at) AS last_update
        FROM courses c
        LEFT JOIN themes t ON t.course_id = c.id
        LEFT JOIN note_blocks b ON b.theme_id = t.id
        GROUP BY c.id
        ORDER BY c.position
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let course_stats: Vec<CourseStats> = rows
        .iter()
        .map(|row| CourseStats {
            title: row.get("title"),
            theme_count: row.get("theme_count"),
            with_notes: row.get("with_notes"),
            block_count: row.get("block_count"),
            last_update_ts: row.get("last_update"),
        })
        .collect();

    if !course_stats.is_empty() {
        println!();
        println!("  By course:");
        println!(
            "  {:<32} {:>6} {:>10} {:>7}   {}",
            "COURSE", "THEMES", "WITH NOTES", "BLOCKS", "NOTES UPDATED"
        );
        println!("  {}", "-".repeat(76));

        for c in &course_stats {
            let updated = match c.last_update_ts {
                Some(ts) => format_ts_relative(ts),
                None => "never".to_string(),
            };
            println!(
                "  {:<32} {:>6} {:>10} {:>7}   {}",
                c.title, c.theme_count, c.with_notes, c.block_count, updated
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

fn percent(part: i64, total: i64) -> i64 {
    if total > 0 {
        (part * 100) / total
    } else {
        0
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;
    if delta < 0 {
        return format_ts(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        plural(delta / 60, "min")
    } else if delta < 86400 {
        plural(delta / 3600, "hour")
    } else if delta < 86400 * 30 {
        plural(delta / 86400, "day")
    } else {
        format_ts(ts)
    }
}

fn plural(n: i64, unit: &str) -> String {
    format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
