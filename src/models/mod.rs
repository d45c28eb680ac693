use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle of a fixture as tracked internally. Every status code the
/// live-fixture provider emits maps onto exactly one of these; unmapped
/// codes fall back to `Scheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "SCHEDULED",
            MatchStatus::Live => "LIVE",
            MatchStatus::Finished => "FINISHED",
            MatchStatus::Postponed => "POSTPONED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "LIVE" => MatchStatus::Live,
            "FINISHED" => MatchStatus::Finished,
            "POSTPONED" => MatchStatus::Postponed,
            _ => MatchStatus::Scheduled,
        }
    }

    /// True for states that make a fixture eligible for analysis hand-off
    /// once it transitions into them.
    pub fn is_in_play_or_done(&self) -> bool {
        matches!(self, MatchStatus::Live | MatchStatus::Finished)
    }
}

/// Editorial state of a per-language translation's long-form analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicationStatus {
    Draft,
    Published,
    Rejected,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::Draft => "DRAFT",
            PublicationStatus::Published => "PUBLISHED",
            PublicationStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "PUBLISHED" => PublicationStatus::Published,
            "REJECTED" => PublicationStatus::Rejected,
            _ => PublicationStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct League {
    pub id: String,
    /// Upstream league key from the market-odds feed, e.g. "soccer_epl".
    /// Nullable: leagues can be seeded before the feed ever names them.
    pub odds_feed_key: Option<String>,
    pub country: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeagueTranslation {
    pub id: String,
    pub league_id: String,
    pub language: String,
    pub name: String,
    pub slug: String,
    pub seo_title: String,
    pub seo_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: String,
    /// Backfilled when a later sighting carries one.
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeamTranslation {
    pub id: String,
    pub team_id: String,
    pub language: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    /// Event id from the market-odds feed. Unique when present.
    pub odds_event_id: Option<String>,
    /// Fixture id from the live-fixture feed, backfilled by the live pass.
    pub fixture_api_id: Option<i64>,
    pub league_id: String,
    pub home_team_id: Option<String>,
    pub away_team_id: Option<String>,
    pub home_team_name: String,
    pub away_team_name: String,
    pub kickoff: DateTime<Utc>,
    pub status: MatchStatus,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub elapsed: Option<i64>,
    pub stats_json: Option<String>,
    pub lineups_json: Option<String>,
    pub h2h_json: Option<String>,
    pub standings_json: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchTranslation {
    pub id: String,
    pub match_id: String,
    pub language: String,
    pub name: String,
    pub slug: String,
    pub analysis: Option<String>,
    pub publication_status: PublicationStatus,
    pub seo_title: String,
    pub seo_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub match_id: String,
    pub home_pct: i64,
    pub draw_pct: i64,
    pub away_pct: i64,
    pub btts_yes_pct: Option<i64>,
    pub btts_no_pct: Option<i64>,
    pub over25_pct: Option<i64>,
    pub under25_pct: Option<i64>,
    /// When set, the row is frozen against automated re-sync.
    pub manual_override: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncLog {
    pub id: String,
    pub feed: String,
    pub status: String,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

// API response types

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingMatchWithPrediction {
    pub match_info: Match,
    pub prediction: Option<Prediction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in [
            MatchStatus::Scheduled,
            MatchStatus::Live,
            MatchStatus::Finished,
            MatchStatus::Postponed,
        ] {
            assert_eq!(MatchStatus::from_str(s.as_str()), s);
        }
    }

    #[test]
    fn unknown_status_defaults_to_scheduled() {
        assert_eq!(MatchStatus::from_str("HALFTIME?"), MatchStatus::Scheduled);
    }
}
