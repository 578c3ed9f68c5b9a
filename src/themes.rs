//! `studyhall themes`: list persisted themes.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store;

pub async fn run_themes(config: &Config, course: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let themes = store::list_themes(&pool, course).await?;
    pool.close().await;

    if themes.is_empty() {
        match course {
            Some(slug) => println!("No themes for course '{}'.", slug),
            None => println!("No themes. Run `studyhall import curriculum` first."),
        }
        return Ok(());
    }

    println!("{:<48} {:>3}  {:<40} {:>6}", "SLUG", "NO", "TITLE", "BLOCKS");
    let mut current_course = String::new();
    for theme in &themes {
        if theme.course_slug != current_course {
            println!("# {}", theme.course_title);
            current_course = theme.course_slug.clone();
        }
        println!(
            "{:<48} {:>3}  {:<40} {:>6}",
            theme.slug, theme.number, theme.title, theme.block_count
        );
    }
    Ok(())
}
