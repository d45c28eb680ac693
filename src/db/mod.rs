use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::env;
use std::str::FromStr;

use crate::models::*;

pub async fn create_pool() -> Result<SqlitePool> {
    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:data/fixturesync.db".to_string());

    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(&database_url);

    if let Some(parent) = std::path::Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database() -> Result<()> {
    let pool = create_pool().await?;
    init_database_with_pool(&pool).await
}

/// Creates the schema idempotently. The unique constraints here are the
/// enforcement backbone for cross-run idempotency: concurrent creation
/// races resolve through them, not through locks.
pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leagues (
            id            TEXT PRIMARY KEY,
            odds_feed_key TEXT UNIQUE,
            country       TEXT,
            logo_url      TEXT,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS league_translations (
            id              TEXT PRIMARY KEY,
            league_id       TEXT NOT NULL,
            language        TEXT NOT NULL,
            name            TEXT NOT NULL,
            slug            TEXT NOT NULL,
            seo_title       TEXT NOT NULL DEFAULT '',
            seo_description TEXT NOT NULL DEFAULT '',
            UNIQUE (language, slug),
            FOREIGN KEY (league_id) REFERENCES leagues (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id         TEXT PRIMARY KEY,
            logo_url   TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_translations (
            id       TEXT PRIMARY KEY,
            team_id  TEXT NOT NULL,
            language TEXT NOT NULL,
            name     TEXT NOT NULL,
            slug     TEXT NOT NULL,
            UNIQUE (language, slug),
            FOREIGN KEY (team_id) REFERENCES teams (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id             TEXT PRIMARY KEY,
            odds_event_id  TEXT UNIQUE,
            fixture_api_id INTEGER UNIQUE,
            league_id      TEXT NOT NULL,
            home_team_id   TEXT,
            away_team_id   TEXT,
            home_team_name TEXT NOT NULL,
            away_team_name TEXT NOT NULL,
            kickoff        TEXT NOT NULL,
            status         TEXT NOT NULL DEFAULT 'SCHEDULED',
            home_score     INTEGER,
            away_score     INTEGER,
            elapsed        INTEGER,
            stats_json     TEXT,
            lineups_json   TEXT,
            h2h_json       TEXT,
            standings_json TEXT,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL,
            FOREIGN KEY (league_id) REFERENCES leagues (id),
            FOREIGN KEY (home_team_id) REFERENCES teams (id),
            FOREIGN KEY (away_team_id) REFERENCES teams (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS match_translations (
            id                 TEXT PRIMARY KEY,
            match_id           TEXT NOT NULL,
            language           TEXT NOT NULL,
            name               TEXT NOT NULL,
            slug               TEXT NOT NULL,
            analysis           TEXT,
            publication_status TEXT NOT NULL DEFAULT 'DRAFT',
            seo_title          TEXT NOT NULL DEFAULT '',
            seo_description    TEXT NOT NULL DEFAULT '',
            UNIQUE (language, slug),
            FOREIGN KEY (match_id) REFERENCES matches (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            match_id        TEXT PRIMARY KEY,
            home_pct        INTEGER NOT NULL,
            draw_pct        INTEGER NOT NULL,
            away_pct        INTEGER NOT NULL,
            btts_yes_pct    INTEGER,
            btts_no_pct     INTEGER,
            over25_pct      INTEGER,
            under25_pct     INTEGER,
            manual_override INTEGER NOT NULL DEFAULT 0,
            updated_at      TEXT NOT NULL,
            FOREIGN KEY (match_id) REFERENCES matches (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_logs (
            id         TEXT PRIMARY KEY,
            feed       TEXT NOT NULL,
            status     TEXT NOT NULL,
            item_count INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_kickoff ON matches(kickoff)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_status ON matches(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_league ON matches(league_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sync_logs_feed ON sync_logs(feed, created_at)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

/// True when the error is a SQLite unique-constraint violation. Creation
/// races are recovered by re-fetching, so callers need to tell this apart
/// from every other database failure.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

// ── League operations ────────────────────────────────────────────────────────

fn league_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<League> {
    Ok(League {
        id: row.get("id"),
        odds_feed_key: row.get("odds_feed_key"),
        country: row.get("country"),
        logo_url: row.get("logo_url"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

/// Plain INSERT so unique violations surface to the resolver, which treats
/// them as "someone else created it first".
pub async fn insert_league(pool: &SqlitePool, league: &League) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO leagues (id, odds_feed_key, country, logo_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&league.id)
    .bind(&league.odds_feed_key)
    .bind(&league.country)
    .bind(&league.logo_url)
    .bind(league.created_at.to_rfc3339())
    .bind(league.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_league_translation(
    pool: &SqlitePool,
    tr: &LeagueTranslation,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO league_translations (id, league_id, language, name, slug, seo_title, seo_description)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&tr.id)
    .bind(&tr.league_id)
    .bind(&tr.language)
    .bind(&tr.name)
    .bind(&tr.slug)
    .bind(&tr.seo_title)
    .bind(&tr.seo_description)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_league_by_feed_key(pool: &SqlitePool, key: &str) -> Result<Option<League>> {
    let row = sqlx::query("SELECT * FROM leagues WHERE odds_feed_key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(league_from_row).transpose()
}

pub async fn get_league_by_id(pool: &SqlitePool, id: &str) -> Result<Option<League>> {
    let row = sqlx::query("SELECT * FROM leagues WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(league_from_row).transpose()
}

pub async fn get_league_translation_by_slug(
    pool: &SqlitePool,
    language: &str,
    slug: &str,
) -> Result<Option<LeagueTranslation>> {
    let row = sqlx::query("SELECT * FROM league_translations WHERE language = ? AND slug = ?")
        .bind(language)
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| LeagueTranslation {
        id: r.get("id"),
        league_id: r.get("league_id"),
        language: r.get("language"),
        name: r.get("name"),
        slug: r.get("slug"),
        seo_title: r.get("seo_title"),
        seo_description: r.get("seo_description"),
    }))
}

/// Display name for a league in one language, for analysis facts.
pub async fn get_league_name(
    pool: &SqlitePool,
    league_id: &str,
    language: &str,
) -> Result<Option<String>> {
    let row = sqlx::query(
        "SELECT name FROM league_translations WHERE league_id = ? AND language = ? LIMIT 1",
    )
    .bind(league_id)
    .bind(language)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.get("name")))
}

/// Backfills the odds-feed key onto a league seeded before the feed named it.
pub async fn set_league_feed_key(pool: &SqlitePool, league_id: &str, key: &str) -> Result<()> {
    sqlx::query("UPDATE leagues SET odds_feed_key = ?, updated_at = ? WHERE id = ?")
        .bind(key)
        .bind(Utc::now().to_rfc3339())
        .bind(league_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_league_logo(pool: &SqlitePool, league_id: &str, logo_url: &str) -> Result<()> {
    sqlx::query("UPDATE leagues SET logo_url = ?, updated_at = ? WHERE id = ?")
        .bind(logo_url)
        .bind(Utc::now().to_rfc3339())
        .bind(league_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ── Team operations ──────────────────────────────────────────────────────────

fn team_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Team> {
    Ok(Team {
        id: row.get("id"),
        logo_url: row.get("logo_url"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

pub async fn insert_team(pool: &SqlitePool, team: &Team) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO teams (id, logo_url, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(&team.id)
        .bind(&team.logo_url)
        .bind(team.created_at.to_rfc3339())
        .bind(team.updated_at.to_rfc3339())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_team_translation(
    pool: &SqlitePool,
    tr: &TeamTranslation,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO team_translations (id, team_id, language, name, slug) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&tr.id)
    .bind(&tr.team_id)
    .bind(&tr.language)
    .bind(&tr.name)
    .bind(&tr.slug)
    .execute(pool)
    .await?;
    Ok(())
}

/// Exact, language-agnostic name lookup across all team translations.
pub async fn find_team_by_translation_name(pool: &SqlitePool, name: &str) -> Result<Option<Team>> {
    let row = sqlx::query(
        r#"
        SELECT t.* FROM teams t
        JOIN team_translations tt ON tt.team_id = t.id
        WHERE tt.name = ?
        LIMIT 1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(team_from_row).transpose()
}

/// Removes a half-created team and its translations after a creation race
/// was lost.
pub async fn delete_team(pool: &SqlitePool, team_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM team_translations WHERE team_id = ?")
        .bind(team_id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM teams WHERE id = ?")
        .bind(team_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_team_logo(pool: &SqlitePool, team_id: &str, logo_url: &str) -> Result<()> {
    sqlx::query("UPDATE teams SET logo_url = ?, updated_at = ? WHERE id = ?")
        .bind(logo_url)
        .bind(Utc::now().to_rfc3339())
        .bind(team_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ── Match operations ─────────────────────────────────────────────────────────

fn match_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Match> {
    Ok(Match {
        id: row.get("id"),
        odds_event_id: row.get("odds_event_id"),
        fixture_api_id: row.get("fixture_api_id"),
        league_id: row.get("league_id"),
        home_team_id: row.get("home_team_id"),
        away_team_id: row.get("away_team_id"),
        home_team_name: row.get("home_team_name"),
        away_team_name: row.get("away_team_name"),
        kickoff: parse_ts(&row.get::<String, _>("kickoff"))?,
        status: MatchStatus::from_str(&row.get::<String, _>("status")),
        home_score: row.get("home_score"),
        away_score: row.get("away_score"),
        elapsed: row.get("elapsed"),
        stats_json: row.get("stats_json"),
        lineups_json: row.get("lineups_json"),
        h2h_json: row.get("h2h_json"),
        standings_json: row.get("standings_json"),
        created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
    })
}

/// Plain INSERT: a unique violation here means another writer claimed the
/// same odds event id or fixture id first, and the caller falls back to a
/// lookup instead of retrying the insert.
pub async fn insert_match(pool: &SqlitePool, m: &Match) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO matches
        (id, odds_event_id, fixture_api_id, league_id, home_team_id, away_team_id,
         home_team_name, away_team_name, kickoff, status, home_score, away_score,
         elapsed, stats_json, lineups_json, h2h_json, standings_json, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&m.id)
    .bind(&m.odds_event_id)
    .bind(m.fixture_api_id)
    .bind(&m.league_id)
    .bind(&m.home_team_id)
    .bind(&m.away_team_id)
    .bind(&m.home_team_name)
    .bind(&m.away_team_name)
    .bind(m.kickoff.to_rfc3339())
    .bind(m.status.as_str())
    .bind(m.home_score)
    .bind(m.away_score)
    .bind(m.elapsed)
    .bind(&m.stats_json)
    .bind(&m.lineups_json)
    .bind(&m.h2h_json)
    .bind(&m.standings_json)
    .bind(m.created_at.to_rfc3339())
    .bind(m.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_match_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Match>> {
    let row = sqlx::query("SELECT * FROM matches WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(match_from_row).transpose()
}

pub async fn get_match_by_odds_event_id(pool: &SqlitePool, event_id: &str) -> Result<Option<Match>> {
    let row = sqlx::query("SELECT * FROM matches WHERE odds_event_id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(match_from_row).transpose()
}

/// Batch pre-fetch for one reconciler pass: everything this league owns.
pub async fn get_matches_by_league(pool: &SqlitePool, league_id: &str) -> Result<Vec<Match>> {
    let rows = sqlx::query("SELECT * FROM matches WHERE league_id = ?")
        .bind(league_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(match_from_row).collect()
}

/// Secondary identity path: look a match up through its per-language
/// translation slug.
pub async fn get_match_by_translation_slug(
    pool: &SqlitePool,
    language: &str,
    slug: &str,
) -> Result<Option<Match>> {
    let row = sqlx::query(
        r#"
        SELECT m.* FROM matches m
        JOIN match_translations mt ON mt.match_id = m.id
        WHERE mt.language = ? AND mt.slug = ?
        "#,
    )
    .bind(language)
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(match_from_row).transpose()
}

pub async fn attach_odds_event_id(
    pool: &SqlitePool,
    match_id: &str,
    event_id: &str,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("UPDATE matches SET odds_event_id = ?, updated_at = ? WHERE id = ?")
        .bind(event_id)
        .bind(Utc::now().to_rfc3339())
        .bind(match_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_fixture_api_id(
    pool: &SqlitePool,
    match_id: &str,
    fixture_api_id: i64,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("UPDATE matches SET fixture_api_id = ?, updated_at = ? WHERE id = ?")
        .bind(fixture_api_id)
        .bind(Utc::now().to_rfc3339())
        .bind(match_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_match_kickoff(
    pool: &SqlitePool,
    match_id: &str,
    kickoff: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE matches SET kickoff = ?, updated_at = ? WHERE id = ?")
        .bind(kickoff.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(match_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_live_state(
    pool: &SqlitePool,
    match_id: &str,
    status: MatchStatus,
    home_score: Option<i64>,
    away_score: Option<i64>,
    elapsed: Option<i64>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE matches
        SET status = ?, home_score = ?, away_score = ?, elapsed = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(home_score)
    .bind(away_score)
    .bind(elapsed)
    .bind(Utc::now().to_rfc3339())
    .bind(match_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Matches the live pass is allowed to touch: not finished, not postponed.
pub async fn get_open_matches(pool: &SqlitePool) -> Result<Vec<Match>> {
    let rows = sqlx::query("SELECT * FROM matches WHERE status IN ('SCHEDULED', 'LIVE')")
        .fetch_all(pool)
        .await?;
    rows.iter().map(match_from_row).collect()
}

/// Opportunistic enrichment refresh: only the provided blobs are replaced.
pub async fn update_match_enrichment(
    pool: &SqlitePool,
    match_id: &str,
    stats_json: Option<&str>,
    lineups_json: Option<&str>,
    h2h_json: Option<&str>,
    standings_json: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE matches
        SET stats_json     = COALESCE(?, stats_json),
            lineups_json   = COALESCE(?, lineups_json),
            h2h_json       = COALESCE(?, h2h_json),
            standings_json = COALESCE(?, standings_json),
            updated_at     = ?
        WHERE id = ?
        "#,
    )
    .bind(stats_json)
    .bind(lineups_json)
    .bind(h2h_json)
    .bind(standings_json)
    .bind(Utc::now().to_rfc3339())
    .bind(match_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Removes a half-created match and its translations after a creation race
/// was lost. Only the reconciler's conflict recovery calls this.
pub async fn delete_match(pool: &SqlitePool, match_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM match_translations WHERE match_id = ?")
        .bind(match_id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM predictions WHERE match_id = ?")
        .bind(match_id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM matches WHERE id = ?")
        .bind(match_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_upcoming_matches(pool: &SqlitePool, limit: i64) -> Result<Vec<Match>> {
    // Kickoffs are stored as RFC 3339 text; compare against the same format.
    let rows = sqlx::query("SELECT * FROM matches WHERE kickoff > ? ORDER BY kickoff LIMIT ?")
        .bind(Utc::now().to_rfc3339())
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.iter().map(match_from_row).collect()
}

// ── Match translation operations ─────────────────────────────────────────────

pub async fn insert_match_translation(
    pool: &SqlitePool,
    tr: &MatchTranslation,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO match_translations
        (id, match_id, language, name, slug, analysis, publication_status, seo_title, seo_description)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&tr.id)
    .bind(&tr.match_id)
    .bind(&tr.language)
    .bind(&tr.name)
    .bind(&tr.slug)
    .bind(&tr.analysis)
    .bind(tr.publication_status.as_str())
    .bind(&tr.seo_title)
    .bind(&tr.seo_description)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_translation_analysis(
    pool: &SqlitePool,
    match_id: &str,
    language: &str,
    analysis: &str,
) -> Result<()> {
    sqlx::query(
        "UPDATE match_translations SET analysis = ? WHERE match_id = ? AND language = ?",
    )
    .bind(analysis)
    .bind(match_id)
    .bind(language)
    .execute(pool)
    .await?;
    Ok(())
}

// ── Prediction operations ────────────────────────────────────────────────────

/// Upsert that respects the manual-override flag: an overridden row is
/// immutable to automated re-sync.
pub async fn upsert_prediction(pool: &SqlitePool, p: &Prediction) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO predictions
        (match_id, home_pct, draw_pct, away_pct, btts_yes_pct, btts_no_pct,
         over25_pct, under25_pct, manual_override, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
        ON CONFLICT (match_id) DO UPDATE SET
            home_pct     = excluded.home_pct,
            draw_pct     = excluded.draw_pct,
            away_pct     = excluded.away_pct,
            btts_yes_pct = excluded.btts_yes_pct,
            btts_no_pct  = excluded.btts_no_pct,
            over25_pct   = excluded.over25_pct,
            under25_pct  = excluded.under25_pct,
            updated_at   = excluded.updated_at
        WHERE predictions.manual_override = 0
        "#,
    )
    .bind(&p.match_id)
    .bind(p.home_pct)
    .bind(p.draw_pct)
    .bind(p.away_pct)
    .bind(p.btts_yes_pct)
    .bind(p.btts_no_pct)
    .bind(p.over25_pct)
    .bind(p.under25_pct)
    .bind(p.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_prediction(pool: &SqlitePool, match_id: &str) -> Result<Option<Prediction>> {
    let row = sqlx::query("SELECT * FROM predictions WHERE match_id = ?")
        .bind(match_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| -> Result<Prediction> {
        Ok(Prediction {
            match_id: r.get("match_id"),
            home_pct: r.get("home_pct"),
            draw_pct: r.get("draw_pct"),
            away_pct: r.get("away_pct"),
            btts_yes_pct: r.get("btts_yes_pct"),
            btts_no_pct: r.get("btts_no_pct"),
            over25_pct: r.get("over25_pct"),
            under25_pct: r.get("under25_pct"),
            manual_override: r.get::<i64, _>("manual_override") != 0,
            updated_at: parse_ts(&r.get::<String, _>("updated_at"))?,
        })
    })
    .transpose()?)
}

pub async fn set_prediction_override(pool: &SqlitePool, match_id: &str, on: bool) -> Result<()> {
    sqlx::query("UPDATE predictions SET manual_override = ? WHERE match_id = ?")
        .bind(if on { 1i64 } else { 0 })
        .bind(match_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ── Sync log operations ──────────────────────────────────────────────────────

pub async fn insert_sync_log(
    pool: &SqlitePool,
    feed: &str,
    status: &str,
    item_count: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO sync_logs (id, feed, status, item_count, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(feed)
    .bind(status)
    .bind(item_count)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn latest_sync_log(pool: &SqlitePool, feed: &str) -> Result<Option<SyncLog>> {
    let row = sqlx::query(
        "SELECT * FROM sync_logs WHERE feed = ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(feed)
    .fetch_optional(pool)
    .await?;

    Ok(row
        .map(|r| -> Result<SyncLog> {
            Ok(SyncLog {
                id: r.get("id"),
                feed: r.get("feed"),
                status: r.get("status"),
                item_count: r.get("item_count"),
                created_at: parse_ts(&r.get::<String, _>("created_at"))?,
            })
        })
        .transpose()?)
}

// ── Test support ─────────────────────────────────────────────────────────────

/// In-memory pool pinned to one connection: SQLite gives every connection
/// its own `:memory:` database, so a pool wider than 1 would fragment state.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    init_database_with_pool(&pool).await.expect("schema");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_league(pool: &SqlitePool) {
        let now = Utc::now();
        insert_league(
            pool,
            &League {
                id: "league-1".to_string(),
                odds_feed_key: Some("soccer_epl".to_string()),
                country: None,
                logo_url: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
    }

    fn sample_match(id: &str, event_id: Option<&str>) -> Match {
        Match {
            id: id.to_string(),
            odds_event_id: event_id.map(str::to_string),
            fixture_api_id: None,
            league_id: "league-1".to_string(),
            home_team_id: None,
            away_team_id: None,
            home_team_name: "Arsenal".to_string(),
            away_team_name: "Chelsea".to_string(),
            kickoff: Utc::now(),
            status: MatchStatus::Scheduled,
            home_score: None,
            away_score: None,
            elapsed: None,
            stats_json: None,
            lineups_json: None,
            h2h_json: None,
            standings_json: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_event_id_is_a_unique_violation() {
        let pool = test_pool().await;
        seed_league(&pool).await;
        insert_match(&pool, &sample_match("m1", Some("ev-1"))).await.unwrap();

        let err = insert_match(&pool, &sample_match("m2", Some("ev-1")))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn manual_override_freezes_prediction() {
        let pool = test_pool().await;
        seed_league(&pool).await;
        insert_match(&pool, &sample_match("m1", Some("ev-1"))).await.unwrap();

        let p = Prediction {
            match_id: "m1".to_string(),
            home_pct: 51,
            draw_pct: 27,
            away_pct: 22,
            btts_yes_pct: None,
            btts_no_pct: None,
            over25_pct: None,
            under25_pct: None,
            manual_override: false,
            updated_at: Utc::now(),
        };
        upsert_prediction(&pool, &p).await.unwrap();
        set_prediction_override(&pool, "m1", true).await.unwrap();

        let changed = Prediction { home_pct: 90, draw_pct: 5, away_pct: 5, ..p.clone() };
        upsert_prediction(&pool, &changed).await.unwrap();

        let stored = get_prediction(&pool, "m1").await.unwrap().unwrap();
        assert_eq!(stored.home_pct, 51);
        assert!(stored.manual_override);
    }

    #[tokio::test]
    async fn translation_slug_resolves_match() {
        let pool = test_pool().await;
        seed_league(&pool).await;
        insert_match(&pool, &sample_match("m1", None)).await.unwrap();
        insert_match_translation(
            &pool,
            &MatchTranslation {
                id: "tr1".to_string(),
                match_id: "m1".to_string(),
                language: "en".to_string(),
                name: "Arsenal vs Chelsea".to_string(),
                slug: "arsenal-vs-chelsea-2026-08-26-en".to_string(),
                analysis: None,
                publication_status: PublicationStatus::Draft,
                seo_title: String::new(),
                seo_description: String::new(),
            },
        )
        .await
        .unwrap();

        let found = get_match_by_translation_slug(&pool, "en", "arsenal-vs-chelsea-2026-08-26-en")
            .await
            .unwrap();
        assert_eq!(found.map(|m| m.id), Some("m1".to_string()));
    }
}
