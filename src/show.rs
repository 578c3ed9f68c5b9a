//! `studyhall show`: print one theme with its note blocks.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::models::{BlockKind, TextRole};
use crate::store::{self, ThemeDetail};

pub async fn run_show(config: &Config, slug: &str, markdown: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let detail = store::load_theme_detail(&pool, slug).await?;
    pool.close().await;

    let Some(detail) = detail else {
        bail!("theme not found: {}", slug);
    };

    if markdown {
        print!("{}", detail.notes_markdown.as_deref().unwrap_or(""));
        return Ok(());
    }
    print_detail(&detail);
    Ok(())
}

fn print_detail(detail: &ThemeDetail) {
    let s = &detail.summary;
    println!("--- Theme ---");
    println!("slug:       {}", s.slug);
    println!("course:     {}", s.course_title);
    println!("number:     {}", s.number);
    println!("title:      {}", s.title);
    if !s.subthemes.is_empty() {
        println!("subthemes:  {}", s.subthemes.join(", "));
    }
    println!("source:     {}", detail.source_text);
    println!();

    println!("--- Blocks ({}) ---", detail.blocks.len());
    for stored in &detail.blocks {
        let block = &stored.block;
        match block.kind {
            BlockKind::Text => {
                let role = block.text_role.unwrap_or(TextRole::Paragraph);
                let level = block
                    .list_level
                    .map(|l| format!(" level={}", l))
                    .unwrap_or_default();
                println!("[{}] {}{}", block.external_key, role.as_str(), level);
                println!("{}", block.text.as_deref().unwrap_or(""));
            }
            BlockKind::Image => {
                println!("[{}] image", block.external_key);
                println!(
                    "{} -> {}",
                    block.image_target.as_deref().unwrap_or("?"),
                    stored.image_id.as_deref().unwrap_or("(not stored)")
                );
            }
            BlockKind::Table => {
                println!("[{}] table", block.external_key);
                println!("{}", block.text.as_deref().unwrap_or(""));
            }
        }
        println!();
    }
}
