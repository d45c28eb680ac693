//! Opportunistic refresh of the cached enrichment blobs (statistics,
//! lineups, head-to-head) for matches already linked to the live-fixture
//! provider. Every resource is independently fallible: a failed fetch is
//! logged and the blob keeps its previous value.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::db;
use crate::models::Match;
use crate::services::fixture_api::{FixtureApi, FixtureRecord};

pub async fn enrich_match(
    pool: &SqlitePool,
    api: &FixtureApi,
    m: &Match,
    record: &FixtureRecord,
) -> Result<()> {
    let fixture_id = m.fixture_api_id.unwrap_or(record.fixture.id);

    let stats = fetch_blob("statistics", api.statistics(fixture_id).await);
    let lineups = fetch_blob("lineups", api.lineups(fixture_id).await);
    let h2h = fetch_blob(
        "head-to-head",
        api.head_to_head(record.teams.home.id, record.teams.away.id).await,
    );
    let standings = if record.league.id > 0 {
        fetch_blob(
            "standings",
            api.standings(record.league.id, record.league.season).await,
        )
    } else {
        None
    };

    if stats.is_none() && lineups.is_none() && h2h.is_none() && standings.is_none() {
        return Ok(());
    }

    db::update_match_enrichment(
        pool,
        &m.id,
        stats.as_deref(),
        lineups.as_deref(),
        h2h.as_deref(),
        standings.as_deref(),
    )
    .await?;

    tracing::debug!("Enriched match {}", m.id);
    Ok(())
}

fn fetch_blob(
    label: &str,
    result: std::result::Result<serde_json::Value, crate::services::feed::FeedError>,
) -> Option<String> {
    match result {
        Ok(value) if !value.is_null() => Some(value.to_string()),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Enrichment fetch ({}) failed: {}", label, e);
            None
        }
    }
}
