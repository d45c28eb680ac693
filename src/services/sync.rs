//! Sync orchestration: drives a full reconciliation batch across the
//! configured leagues sequentially (upstream rate limits rule out
//! fan-out), throttles between leagues, and writes one audit-log row per
//! run. The audit log's freshness check gates the opportunistic background
//! trigger.

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::env;

use crate::db;
use crate::services::analysis::{AnalysisGenerator, HttpAnalysisGenerator};
use crate::services::fixture_api::FixtureApi;
use crate::services::league_resolver::LeagueCache;
use crate::services::live::LiveUpdater;
use crate::services::odds_api::OddsApi;
use crate::services::reconciler::Reconciler;

pub const ODDS_FEED: &str = "odds";
pub const LIVE_FEED: &str = "live";

const INTER_LEAGUE_DELAY_SECS: u64 = 2;
const SYNC_FRESHNESS_MINUTES: i64 = 30;

/// Runtime configuration for one sync run, read from the environment at
/// construction.
pub struct SyncConfig {
    pub leagues: Vec<String>,
    pub languages: Vec<String>,
    pub popular_leagues: Vec<String>,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self {
            leagues: csv_env("SYNC_LEAGUES", "soccer_epl,soccer_spain_la_liga,soccer_germany_bundesliga"),
            languages: csv_env("SYNC_LANGUAGES", "en"),
            popular_leagues: csv_env("POPULAR_LEAGUES", "soccer_epl"),
        }
    }
}

fn csv_env(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Default, Serialize)]
pub struct SyncOutcome {
    pub synced: u32,
    pub analyzed: u32,
    pub errors: Vec<String>,
}

/// Full reconciliation batch across all configured leagues. The league
/// cache lives and dies with this call; reusing it across runs would serve
/// stale leagues.
pub async fn run_full_sync(
    pool: &SqlitePool,
    date: Option<NaiveDate>,
    analyze: bool,
) -> Result<SyncOutcome> {
    let config = SyncConfig::from_env();
    let odds_api = OddsApi::from_env()?;

    let generator = if analyze { HttpAnalysisGenerator::from_env() } else { None };
    let analysis: Option<&dyn AnalysisGenerator> =
        generator.as_ref().map(|g| g as &dyn AnalysisGenerator);

    let reconciler = Reconciler::new(pool, &config.languages, &config.popular_leagues, analysis);
    let mut cache = LeagueCache::new();
    let mut outcome = SyncOutcome::default();

    for (i, league_key) in config.leagues.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(std::time::Duration::from_secs(INTER_LEAGUE_DELAY_SECS)).await;
        }

        match reconciler.sync_league(&odds_api, &mut cache, league_key, date).await {
            Ok(report) => {
                tracing::info!(
                    "League {}: {} created, {} updated, {} linked, {} errors",
                    league_key, report.created, report.updated, report.linked, report.errors.len()
                );
                outcome.synced += report.synced();
                outcome.analyzed += report.analyzed;
                outcome.errors.extend(report.errors);
            }
            Err(e) if e.aborts_provider() => {
                // Auth or rate-limit failure affects every remaining league
                // on this provider; stop the batch here.
                tracing::error!("Provider aborted at league {}: {}", league_key, e);
                outcome.errors.push(format!("league {}: {}", league_key, e));
                break;
            }
            Err(e) => {
                tracing::error!("League {} failed: {}", league_key, e);
                outcome.errors.push(format!("league {}: {}", league_key, e));
            }
        }
    }

    let status = if outcome.errors.is_empty() { "completed" } else { "completed_with_errors" };
    db::insert_sync_log(pool, ODDS_FEED, status, outcome.synced as i64).await?;

    tracing::info!(
        "Full sync done: {} synced, {} analyzed, {} errors",
        outcome.synced, outcome.analyzed, outcome.errors.len()
    );
    Ok(outcome)
}

/// Live-score refresh pass over already-known fixtures. Status transitions
/// are only observable here, so this pass also carries the analysis
/// generator for transition-triggered hand-off.
pub async fn run_live_refresh(pool: &SqlitePool) -> Result<SyncOutcome> {
    let config = SyncConfig::from_env();
    let api = FixtureApi::from_env()?;

    let generator = HttpAnalysisGenerator::from_env();
    let analysis: Option<&dyn AnalysisGenerator> =
        generator.as_ref().map(|g| g as &dyn AnalysisGenerator);

    let updater = LiveUpdater::new(pool, &config.languages, &config.popular_leagues, analysis);
    let report = updater.refresh(&api).await?;

    let status = if report.errors.is_empty() { "completed" } else { "completed_with_errors" };
    db::insert_sync_log(pool, LIVE_FEED, status, report.updated as i64).await?;

    Ok(SyncOutcome {
        synced: report.updated,
        analyzed: report.analyzed,
        errors: report.errors,
    })
}

/// True when the last audit-log entry for the feed is older than the
/// freshness threshold (or absent). Best-effort: callers use this to decide
/// whether to emit a background sync, never to block a response.
pub async fn is_sync_due(pool: &SqlitePool, feed: &str) -> bool {
    match db::latest_sync_log(pool, feed).await {
        Ok(Some(log)) => {
            Utc::now().signed_duration_since(log.created_at)
                > Duration::minutes(SYNC_FRESHNESS_MINUTES)
        }
        Ok(None) => true,
        Err(e) => {
            tracing::warn!("Freshness check failed ({}), assuming sync due: {}", feed, e);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn sync_is_due_without_any_log() {
        let pool = test_pool().await;
        assert!(is_sync_due(&pool, ODDS_FEED).await);
    }

    #[tokio::test]
    async fn fresh_log_suppresses_sync() {
        let pool = test_pool().await;
        db::insert_sync_log(&pool, ODDS_FEED, "completed", 10).await.unwrap();
        assert!(!is_sync_due(&pool, ODDS_FEED).await);
        // Another feed's log does not count.
        assert!(is_sync_due(&pool, LIVE_FEED).await);
    }
}
