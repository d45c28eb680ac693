//! Maps an upstream league key/name onto an internal league record,
//! creating one (with per-language translations and SEO stubs) on first
//! sighting. Creation races resolve through the unique constraint: a
//! conflicting insert is read back as "someone else created it first".

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db;
use crate::models::{League, LeagueTranslation};
use crate::utils::slugify;

/// Per-run cache keyed by odds-feed key. Scoped to one orchestrator run and
/// discarded with it; sharing across runs would serve stale leagues.
#[derive(Default)]
pub struct LeagueCache {
    by_feed_key: HashMap<String, League>,
}

impl LeagueCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<&League> {
        self.by_feed_key.get(key)
    }

    fn put(&mut self, league: League) {
        if let Some(key) = league.odds_feed_key.clone() {
            self.by_feed_key.insert(key, league);
        }
    }
}

pub struct UpstreamLeague<'a> {
    pub feed_key: &'a str,
    pub name: &'a str,
    pub country: Option<&'a str>,
    pub logo_url: Option<&'a str>,
}

/// Lookup order: run cache → persisted league by feed key → persisted
/// translation by derived default-language slug (backfills the feed key) →
/// create.
pub async fn resolve(
    pool: &SqlitePool,
    cache: &mut LeagueCache,
    upstream: &UpstreamLeague<'_>,
    languages: &[String],
) -> Result<League> {
    if let Some(league) = cache.get(upstream.feed_key) {
        return Ok(league.clone());
    }

    if let Some(league) = db::get_league_by_feed_key(pool, upstream.feed_key).await? {
        let league = refresh_logo(pool, league, upstream.logo_url).await?;
        cache.put(league.clone());
        return Ok(league);
    }

    // Leagues seeded before the feed named them are reachable only through
    // the default-language slug.
    let default_language = languages.first().map(String::as_str).unwrap_or("en");
    let slug = slugify(upstream.name);
    if let Some(tr) = db::get_league_translation_by_slug(pool, default_language, &slug).await? {
        db::set_league_feed_key(pool, &tr.league_id, upstream.feed_key).await?;
        if let Some(league) = db::get_league_by_id(pool, &tr.league_id).await? {
            let league = refresh_logo(pool, league, upstream.logo_url).await?;
            tracing::info!(
                "League '{}' linked by slug, feed key '{}' backfilled",
                upstream.name, upstream.feed_key
            );
            cache.put(league.clone());
            return Ok(league);
        }
    }

    let league = match create(pool, upstream, languages).await {
        Ok(league) => {
            tracing::info!("Created league '{}' ({})", upstream.name, upstream.feed_key);
            league
        }
        Err(e) if db::is_unique_violation(&e) => {
            // Lost the creation race; the winner's row is the answer.
            db::get_league_by_feed_key(pool, upstream.feed_key)
                .await?
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "league '{}' vanished after unique conflict",
                        upstream.feed_key
                    )
                })?
        }
        Err(e) => return Err(e.into()),
    };

    cache.put(league.clone());
    Ok(league)
}

async fn refresh_logo(
    pool: &SqlitePool,
    mut league: League,
    logo_url: Option<&str>,
) -> Result<League> {
    if let Some(logo) = logo_url {
        if league.logo_url.as_deref() != Some(logo) {
            db::update_league_logo(pool, &league.id, logo).await?;
            league.logo_url = Some(logo.to_string());
        }
    }
    Ok(league)
}

async fn create(
    pool: &SqlitePool,
    upstream: &UpstreamLeague<'_>,
    languages: &[String],
) -> std::result::Result<League, sqlx::Error> {
    let now = Utc::now();
    let league = League {
        id: Uuid::new_v4().to_string(),
        odds_feed_key: Some(upstream.feed_key.to_string()),
        country: upstream.country.map(str::to_string),
        logo_url: upstream.logo_url.map(str::to_string),
        created_at: now,
        updated_at: now,
    };
    db::insert_league(pool, &league).await?;

    for language in languages {
        let tr = LeagueTranslation {
            id: Uuid::new_v4().to_string(),
            league_id: league.id.clone(),
            language: language.clone(),
            name: upstream.name.to_string(),
            slug: slugify(upstream.name),
            seo_title: format!("{} fixtures, results and predictions", upstream.name),
            seo_description: format!(
                "Upcoming {} fixtures with win probabilities and live scores.",
                upstream.name
            ),
        };
        db::insert_league_translation(pool, &tr).await?;
    }

    Ok(league)
}
