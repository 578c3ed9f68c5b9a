use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Idempotent.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Create courses table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            position INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create themes table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS themes (
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            normalized_title TEXT NOT NULL,
            number INTEGER NOT NULL,
            title TEXT NOT NULL,
            subthemes_json TEXT NOT NULL DEFAULT '[]',
            source_text TEXT NOT NULL,
            position INTEGER NOT NULL,
            notes_markdown TEXT,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create note_blocks table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS note_blocks (
            id TEXT PRIMARY KEY,
            theme_id TEXT NOT NULL,
            external_key TEXT NOT NULL,
            position INTEGER NOT NULL,
            kind TEXT NOT NULL,
            text TEXT,
            text_role TEXT,
            list_level INTEGER,
            rich_text_json TEXT,
            source_image_name TEXT,
            image_target TEXT,
            image_id TEXT,
            updated_at INTEGER NOT NULL,
            UNIQUE(theme_id, external_key),
            FOREIGN KEY (theme_id) REFERENCES themes(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create images table (package target -> stored image id)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            target TEXT PRIMARY KEY,
            image_id TEXT NOT NULL,
            byte_len INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_themes_course_id ON themes(course_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_themes_position ON themes(position)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_note_blocks_theme ON note_blocks(theme_id, position)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
