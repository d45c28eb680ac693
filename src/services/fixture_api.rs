//! Live-fixture provider client (API-Sports style, header auth).
//!
//! Supplies live/recent fixtures for the score-refresh pass plus the
//! opportunistically cached enrichment resources (statistics, lineups,
//! head-to-head, standings).

use serde::Deserialize;
use std::env;

use super::feed::{FeedAuth, FeedClient, FeedError};
use crate::models::MatchStatus;

#[derive(Debug, Deserialize)]
pub struct FixtureEnvelope {
    #[serde(default)]
    pub response: Vec<FixtureRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureRecord {
    pub fixture: FixtureInfo,
    #[serde(default)]
    pub league: FixtureLeague,
    #[serde(default)]
    pub goals: Goals,
    pub teams: FixtureTeams,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureLeague {
    pub id: i64,
    #[serde(default)]
    pub season: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureInfo {
    pub id: i64,
    pub date: String,
    pub status: FixtureStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureStatus {
    pub short: String,
    pub elapsed: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Goals {
    pub home: Option<i64>,
    pub away: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureTeams {
    pub home: FixtureTeam,
    pub away: FixtureTeam,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureTeam {
    pub id: i64,
    pub name: String,
    pub logo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(default)]
    pub response: serde_json::Value,
}

/// Maps a provider status code onto the internal lifecycle. Every code maps
/// to exactly one status; unknown codes default to `Scheduled` and are
/// logged by the caller.
pub fn map_status(short: &str) -> MatchStatus {
    match short {
        "NS" | "TBD" => MatchStatus::Scheduled,
        "1H" | "HT" | "2H" | "ET" | "BT" | "P" | "LIVE" | "INT" => MatchStatus::Live,
        "FT" | "AET" | "PEN" | "WO" => MatchStatus::Finished,
        "PST" | "CANC" | "ABD" | "SUSP" => MatchStatus::Postponed,
        other => {
            tracing::warn!("Unmapped fixture status '{}', defaulting to SCHEDULED", other);
            MatchStatus::Scheduled
        }
    }
}

pub struct FixtureApi {
    client: FeedClient,
}

impl FixtureApi {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env::var("FIXTURE_API_KEY")
            .map_err(|_| anyhow::anyhow!("FIXTURE_API_KEY not set"))?;
        let base_url = env::var("FIXTURE_API_BASE_URL")
            .unwrap_or_else(|_| "https://v3.football.api-sports.io".to_string());

        Ok(Self {
            client: FeedClient::new(
                base_url,
                FeedAuth::Header { name: "x-apisports-key", key: api_key },
            ),
        })
    }

    /// Fixtures currently in play.
    pub async fn live_fixtures(&self) -> Result<Vec<FixtureRecord>, FeedError> {
        let envelope: FixtureEnvelope = self
            .client
            .get_json("fixtures", &[("live", "all".to_string())])
            .await?;
        Ok(envelope.response)
    }

    /// Fixtures for a calendar date, used to pick up freshly finished games
    /// the live filter no longer returns.
    pub async fn fixtures_by_date(&self, date: &str) -> Result<Vec<FixtureRecord>, FeedError> {
        let envelope: FixtureEnvelope = self
            .client
            .get_json("fixtures", &[("date", date.to_string())])
            .await?;
        Ok(envelope.response)
    }

    pub async fn statistics(&self, fixture_id: i64) -> Result<serde_json::Value, FeedError> {
        let envelope: RawEnvelope = self
            .client
            .get_json("fixtures/statistics", &[("fixture", fixture_id.to_string())])
            .await?;
        Ok(envelope.response)
    }

    pub async fn lineups(&self, fixture_id: i64) -> Result<serde_json::Value, FeedError> {
        let envelope: RawEnvelope = self
            .client
            .get_json("fixtures/lineups", &[("fixture", fixture_id.to_string())])
            .await?;
        Ok(envelope.response)
    }

    pub async fn head_to_head(&self, home_id: i64, away_id: i64) -> Result<serde_json::Value, FeedError> {
        let envelope: RawEnvelope = self
            .client
            .get_json(
                "fixtures/headtohead",
                &[("h2h", format!("{}-{}", home_id, away_id)), ("last", "5".to_string())],
            )
            .await?;
        Ok(envelope.response)
    }

    pub async fn standings(&self, league_id: i64, season: i32) -> Result<serde_json::Value, FeedError> {
        let envelope: RawEnvelope = self
            .client
            .get_json(
                "standings",
                &[("league", league_id.to_string()), ("season", season.to_string())],
            )
            .await?;
        Ok(envelope.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_status_maps_once() {
        let known = [
            ("NS", MatchStatus::Scheduled),
            ("TBD", MatchStatus::Scheduled),
            ("1H", MatchStatus::Live),
            ("HT", MatchStatus::Live),
            ("2H", MatchStatus::Live),
            ("ET", MatchStatus::Live),
            ("BT", MatchStatus::Live),
            ("P", MatchStatus::Live),
            ("LIVE", MatchStatus::Live),
            ("INT", MatchStatus::Live),
            ("FT", MatchStatus::Finished),
            ("AET", MatchStatus::Finished),
            ("PEN", MatchStatus::Finished),
            ("WO", MatchStatus::Finished),
            ("PST", MatchStatus::Postponed),
            ("CANC", MatchStatus::Postponed),
            ("ABD", MatchStatus::Postponed),
            ("SUSP", MatchStatus::Postponed),
        ];
        for (code, expected) in known {
            assert_eq!(map_status(code), expected, "code {}", code);
        }
    }

    #[test]
    fn unmapped_status_defaults_to_scheduled() {
        assert_eq!(map_status("XYZ"), MatchStatus::Scheduled);
        assert_eq!(map_status(""), MatchStatus::Scheduled);
    }
}
