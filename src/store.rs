//! SQLite persistence for the curriculum tree and note blocks.
//!
//! Every write goes through a natural key: courses and themes by slug, note
//! blocks by `(theme_id, external_key)`. Re-importing unchanged input is
//! therefore a no-op apart from `updated_at`, and anything absent from a new
//! import is removed.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{BlockKind, NoteBlock, ParsedCurriculum, RichTextSegment, TextRole, ThemeLookup};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurriculumWriteStats {
    pub courses_upserted: u64,
    pub themes_upserted: u64,
    pub courses_removed: u64,
    pub themes_removed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockWriteStats {
    pub written: u64,
    pub removed: u64,
}

/// Persist a parsed curriculum, replacing the previous one.
pub async fn upsert_curriculum(
    pool: &SqlitePool,
    parsed: &ParsedCurriculum,
) -> Result<CurriculumWriteStats> {
    let now = chrono::Utc::now().timestamp();
    let mut stats = CurriculumWriteStats::default();
    let mut tx = pool.begin().await?;

    let existing_courses: HashMap<String, String> =
        sqlx::query("SELECT slug, id FROM courses")
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| (row.get("slug"), row.get("id")))
            .collect();
    let existing_themes: HashMap<String, String> = sqlx::query("SELECT slug, id FROM themes")
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|row| (row.get("slug"), row.get("id")))
        .collect();

    // Slug → id of every row written in this transaction. A course heading
    // repeated in the syllabus yields several courses with one slug; they all
    // share the row written first.
    let mut course_ids: HashMap<String, String> = existing_courses.clone();
    let mut theme_ids: HashMap<String, String> = existing_themes.clone();
    let mut seen_courses = HashSet::new();
    let mut seen_themes = HashSet::new();

    for course in &parsed.courses {
        let course_id = course_ids
            .entry(course.slug.clone())
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone();

        sqlx::query(
            r#"
            INSERT INTO courses (id, slug, title, position, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                title = excluded.title,
                position = excluded.position,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&course_id)
        .bind(&course.slug)
        .bind(&course.title)
        .bind(course.order)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if seen_courses.insert(course.slug.clone()) {
            stats.courses_upserted += 1;
        }

        for theme in &course.themes {
            let theme_id = theme_ids
                .entry(theme.slug.clone())
                .or_insert_with(|| Uuid::new_v4().to_string())
                .clone();
            let subthemes_json = serde_json::to_string(&theme.subthemes)?;

            sqlx::query(
                r#"
                INSERT INTO themes (id, course_id, slug, normalized_title, number, title, subthemes_json, source_text, position, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(slug) DO UPDATE SET
                    course_id = excluded.course_id,
                    normalized_title = excluded.normalized_title,
                    number = excluded.number,
                    title = excluded.title,
                    subthemes_json = excluded.subthemes_json,
                    source_text = excluded.source_text,
                    position = excluded.position,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&theme_id)
            .bind(&course_id)
            .bind(&theme.slug)
            .bind(&theme.normalized_title)
            .bind(theme.number)
            .bind(&theme.title)
            .bind(&subthemes_json)
            .bind(&theme.source_text)
            .bind(theme.order)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            if seen_themes.insert(theme.slug.clone()) {
                stats.themes_upserted += 1;
            }
        }
    }

    // Remove themes (and their blocks) that disappeared from the syllabus
    for (slug, id) in &existing_themes {
        if seen_themes.contains(slug) {
            continue;
        }
        sqlx::query("DELETE FROM note_blocks WHERE theme_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM themes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        stats.themes_removed += 1;
    }

    for (slug, id) in &existing_courses {
        if seen_courses.contains(slug) {
            continue;
        }
        sqlx::query(
            "DELETE FROM note_blocks WHERE theme_id IN (SELECT id FROM themes WHERE course_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        let removed = sqlx::query("DELETE FROM themes WHERE course_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        stats.themes_removed += removed.rows_affected();
        sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        stats.courses_removed += 1;
    }

    tx.commit().await?;
    Ok(stats)
}

/// All persisted themes as lookups, sorted by slug.
pub async fn load_theme_lookups(pool: &SqlitePool) -> Result<Vec<ThemeLookup>> {
    let rows = sqlx::query("SELECT id, slug, title, normalized_title FROM themes ORDER BY slug")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|row| ThemeLookup {
            id: row.get("id"),
            slug: row.get("slug"),
            title: row.get("title"),
            normalized_title: row.get("normalized_title"),
        })
        .collect())
}

/// Replace one theme's blocks with `blocks`, upserting by external key.
///
/// `image_ids` maps package image targets to stored image ids.
pub async fn sync_theme_blocks(
    pool: &SqlitePool,
    theme_id: &str,
    blocks: &[NoteBlock],
    image_ids: &HashMap<String, String>,
    notes_markdown: &str,
) -> Result<BlockWriteStats> {
    let now = chrono::Utc::now().timestamp();
    let mut stats = BlockWriteStats::default();
    let mut tx = pool.begin().await?;

    let existing: HashMap<String, String> =
        sqlx::query("SELECT external_key, id FROM note_blocks WHERE theme_id = ?")
            .bind(theme_id)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| (row.get("external_key"), row.get("id")))
            .collect();

    let mut keep = HashSet::new();
    for block in blocks {
        let id = existing
            .get(&block.external_key)
            .cloned()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let image_id = block
            .image_target
            .as_ref()
            .and_then(|target| image_ids.get(target))
            .cloned();

        sqlx::query(
            r#"
            INSERT INTO note_blocks (id, theme_id, external_key, position, kind, text, text_role, list_level, rich_text_json, source_image_name, image_target, image_id, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(theme_id, external_key) DO UPDATE SET
                position = excluded.position,
                kind = excluded.kind,
                text = excluded.text,
                text_role = excluded.text_role,
                list_level = excluded.list_level,
                rich_text_json = excluded.rich_text_json,
                source_image_name = excluded.source_image_name,
                image_target = excluded.image_target,
                image_id = excluded.image_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(theme_id)
        .bind(&block.external_key)
        .bind(block.order)
        .bind(block.kind.as_str())
        .bind(&block.text)
        .bind(block.text_role.map(|r| r.as_str()))
        .bind(block.list_level.map(i64::from))
        .bind(block.rich_text_json())
        .bind(&block.source_image_name)
        .bind(&block.image_target)
        .bind(image_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        keep.insert(block.external_key.clone());
        stats.written += 1;
    }

    for (key, id) in &existing {
        if keep.contains(key) {
            continue;
        }
        sqlx::query("DELETE FROM note_blocks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        stats.removed += 1;
    }

    sqlx::query("UPDATE themes SET notes_markdown = ?, updated_at = ? WHERE id = ?")
        .bind(notes_markdown)
        .bind(now)
        .bind(theme_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(stats)
}

/// Remember which stored image a package target was uploaded as.
pub async fn record_image(
    pool: &SqlitePool,
    target: &str,
    image_id: &str,
    byte_len: usize,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO images (target, image_id, byte_len, updated_at) VALUES (?, ?, ?, ?)
        ON CONFLICT(target) DO UPDATE SET
            image_id = excluded.image_id,
            byte_len = excluded.byte_len,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(target)
    .bind(image_id)
    .bind(byte_len as i64)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Read side
// ═══════════════════════════════════════════════════════════════════════

/// One theme row for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeSummary {
    pub id: String,
    pub slug: String,
    pub course_slug: String,
    pub course_title: String,
    pub number: i64,
    pub title: String,
    pub subthemes: Vec<String>,
    pub position: i64,
    pub block_count: i64,
}

/// A persisted block together with the id of its stored image.
#[derive(Debug, Clone, Serialize)]
pub struct StoredBlock {
    #[serde(flatten)]
    pub block: NoteBlock,
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeDetail {
    #[serde(flatten)]
    pub summary: ThemeSummary,
    pub source_text: String,
    pub notes_markdown: Option<String>,
    pub blocks: Vec<StoredBlock>,
}

fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> ThemeSummary {
    let subthemes_json: String = row.get("subthemes_json");
    ThemeSummary {
        id: row.get("id"),
        slug: row.get("slug"),
        course_slug: row.get("course_slug"),
        course_title: row.get("course_title"),
        number: row.get("number"),
        title: row.get("title"),
        subthemes: serde_json::from_str(&subthemes_json).unwrap_or_default(),
        position: row.get("position"),
        block_count: row.get("block_count"),
    }
}

const THEME_SUMMARY_SELECT: &str = r#"
    SELECT t.id, t.slug, t.number, t.title, t.subthemes_json, t.position,
           t.source_text, t.notes_markdown,
           c.slug AS course_slug, c.title AS course_title,
           (SELECT COUNT(*) FROM note_blocks b WHERE b.theme_id = t.id) AS block_count
    FROM themes t
    JOIN courses c ON c.id = t.course_id
"#;

/// Themes in display order, optionally limited to one course.
pub async fn list_themes(pool: &SqlitePool, course_slug: Option<&str>) -> Result<Vec<ThemeSummary>> {
    let rows = match course_slug {
        Some(slug) => {
            let sql = format!("{} WHERE c.slug = ? ORDER BY t.position", THEME_SUMMARY_SELECT);
            sqlx::query(&sql).bind(slug).fetch_all(pool).await?
        }
        None => {
            let sql = format!("{} ORDER BY t.position", THEME_SUMMARY_SELECT);
            sqlx::query(&sql).fetch_all(pool).await?
        }
    };
    Ok(rows.iter().map(row_to_summary).collect())
}

/// Blocks of one theme in display order.
pub async fn load_blocks(pool: &SqlitePool, theme_id: &str) -> Result<Vec<StoredBlock>> {
    let rows = sqlx::query(
        r#"
        SELECT external_key, position, kind, text, text_role, list_level, rich_text_json,
               source_image_name, image_target, image_id
        FROM note_blocks WHERE theme_id = ? ORDER BY position ASC
        "#,
    )
    .bind(theme_id)
    .fetch_all(pool)
    .await?;

    let mut blocks = Vec::with_capacity(rows.len());
    for row in &rows {
        let kind: String = row.get("kind");
        let role: Option<String> = row.get("text_role");
        let level: Option<i64> = row.get("list_level");
        let rich_json: Option<String> = row.get("rich_text_json");
        let rich_text: Option<Vec<RichTextSegment>> = match rich_json {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };
        blocks.push(StoredBlock {
            block: NoteBlock {
                external_key: row.get("external_key"),
                order: row.get("position"),
                kind: BlockKind::parse(&kind)
                    .ok_or_else(|| anyhow::anyhow!("unknown block kind in database: {}", kind))?,
                text: row.get("text"),
                text_role: role.as_deref().and_then(TextRole::parse),
                list_level: level.and_then(|l| u32::try_from(l).ok()),
                rich_text,
                source_image_name: row.get("source_image_name"),
                image_target: row.get("image_target"),
            },
            image_id: row.get("image_id"),
        });
    }
    Ok(blocks)
}

/// Full theme view by slug, or `None` when no such theme exists.
pub async fn load_theme_detail(pool: &SqlitePool, slug: &str) -> Result<Option<ThemeDetail>> {
    let sql = format!("{} WHERE t.slug = ?", THEME_SUMMARY_SELECT);
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let summary = row_to_summary(&row);
    let blocks = load_blocks(pool, &summary.id).await?;
    Ok(Some(ThemeDetail {
        source_text: row.get("source_text"),
        notes_markdown: row.get("notes_markdown"),
        summary,
        blocks,
    }))
}
