use anyhow::Result;
use chrono::NaiveDate;

use crate::db::{self, create_pool};
use crate::services::sync;

pub async fn run_sync(date: Option<String>, analyze: bool) -> Result<()> {
    let pool = create_pool().await?;
    db::init_database_with_pool(&pool).await?;

    let date = date
        .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| anyhow::anyhow!("date must be YYYY-MM-DD: {}", e))?;

    let outcome = sync::run_full_sync(&pool, date, analyze).await?;

    println!("Synced {} fixtures, {} analyzed", outcome.synced, outcome.analyzed);
    if !outcome.errors.is_empty() {
        println!("{} errors:", outcome.errors.len());
        for e in &outcome.errors {
            println!("  - {}", e);
        }
    }
    Ok(())
}

pub async fn run_live() -> Result<()> {
    let pool = create_pool().await?;
    db::init_database_with_pool(&pool).await?;

    let outcome = sync::run_live_refresh(&pool).await?;

    println!("Updated {} live fixtures", outcome.synced);
    if !outcome.errors.is_empty() {
        println!("{} errors:", outcome.errors.len());
        for e in &outcome.errors {
            println!("  - {}", e);
        }
    }
    Ok(())
}
