//! Resolves an upstream team name to an internal team, creating it lazily
//! on first sighting.
//!
//! Identity here is exact name equality across translations, deliberately
//! stricter than the fuzzy matching used for fixtures: team rows fan out
//! into slugs and translations, and a false merge there is much more
//! expensive than a duplicate that exact matching occasionally allows.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::models::{Team, TeamTranslation};
use crate::utils::slugify;

/// Exact-match lookup on any translation name; on miss, create the team
/// plus one translation per configured language. Backfills the logo when a
/// later sighting finally carries one.
pub async fn resolve(
    pool: &SqlitePool,
    name: &str,
    logo_url: Option<&str>,
    languages: &[String],
) -> Result<Team> {
    if let Some(mut team) = db::find_team_by_translation_name(pool, name).await? {
        if team.logo_url.is_none() {
            if let Some(logo) = logo_url {
                db::update_team_logo(pool, &team.id, logo).await?;
                team.logo_url = Some(logo.to_string());
                tracing::debug!("Backfilled logo for team '{}'", name);
            }
        }
        return Ok(team);
    }

    create(pool, name, logo_url, languages, Utc::now().timestamp_millis()).await
}

/// Creates the team row plus its translations. The team table itself has
/// no natural key, so a same-name race only surfaces on the translation
/// slug constraint; losing it means cleaning up the half-created team and
/// returning the winner's row.
async fn create(
    pool: &SqlitePool,
    name: &str,
    logo_url: Option<&str>,
    languages: &[String],
    slug_suffix: i64,
) -> Result<Team> {
    let now = Utc::now();
    let team = Team {
        id: Uuid::new_v4().to_string(),
        logo_url: logo_url.map(str::to_string),
        created_at: now,
        updated_at: now,
    };
    db::insert_team(pool, &team).await?;

    // Common club names collide on plain slugs; a time-based suffix keeps
    // each translation slug unique per language.
    for language in languages {
        let tr = TeamTranslation {
            id: Uuid::new_v4().to_string(),
            team_id: team.id.clone(),
            language: language.clone(),
            name: name.to_string(),
            slug: format!("{}-{}-{}", slugify(name), language, slug_suffix),
        };
        if let Err(e) = db::insert_team_translation(pool, &tr).await {
            // A half-created team must not outlive a failed create.
            db::delete_team(pool, &team.id).await?;
            if db::is_unique_violation(&e) {
                if let Some(existing) = db::find_team_by_translation_name(pool, name).await? {
                    return Ok(existing);
                }
            }
            return Err(e.into());
        }
    }

    tracing::info!("Created team '{}'", name);
    Ok(team)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use sqlx::Row;

    #[tokio::test]
    async fn resolve_is_idempotent_per_name() {
        let pool = test_pool().await;
        let languages = vec!["en".to_string(), "de".to_string()];

        let a = resolve(&pool, "Arsenal", None, &languages).await.unwrap();
        let b = resolve(&pool, "Arsenal", None, &languages).await.unwrap();
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    async fn exact_matching_does_not_merge_variants() {
        let pool = test_pool().await;
        let languages = vec!["en".to_string()];

        let a = resolve(&pool, "Arsenal", None, &languages).await.unwrap();
        let b = resolve(&pool, "Arsenal FC", None, &languages).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn losing_a_same_name_race_returns_the_winner_without_orphans() {
        let pool = test_pool().await;
        let languages = vec!["en".to_string()];

        // Two writers race the same name past the lookup; forcing the same
        // slug suffix makes the second creation collide deterministically.
        let winner = create(&pool, "Arsenal", None, &languages, 1_000).await.unwrap();
        let loser = create(&pool, "Arsenal", None, &languages, 1_000).await.unwrap();
        assert_eq!(loser.id, winner.id);

        let count: i64 = sqlx::query("SELECT COUNT(*) AS c FROM teams")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("c");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn logo_is_backfilled_once_available() {
        let pool = test_pool().await;
        let languages = vec!["en".to_string()];

        let created = resolve(&pool, "Chelsea", None, &languages).await.unwrap();
        assert!(created.logo_url.is_none());

        let enriched = resolve(&pool, "Chelsea", Some("https://cdn/logo.png"), &languages)
            .await
            .unwrap();
        assert_eq!(enriched.id, created.id);
        assert_eq!(enriched.logo_url.as_deref(), Some("https://cdn/logo.png"));
    }
}
