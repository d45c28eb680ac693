//! Market-odds provider client.
//!
//! Per-league "events" (free) and "odds" (rate-limited) endpoints. Events
//! drive fixture discovery; odds carry the nested bookmaker/market/outcome
//! structures the probability extractor consumes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::env;

use super::feed::{FeedAuth, FeedClient, FeedError};

#[derive(Debug, Clone, Deserialize)]
pub struct OddsEvent {
    pub id: String,
    #[serde(default)]
    pub sport_key: String,
    #[serde(default)]
    pub sport_title: String,
    pub commence_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bookmaker {
    #[serde(default)]
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub markets: Vec<Market>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Market {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Outcome {
    pub name: String,
    pub price: f64,
    pub point: Option<f64>,
}

pub struct OddsApi {
    client: FeedClient,
}

impl OddsApi {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env::var("ODDS_API_KEY")
            .map_err(|_| anyhow::anyhow!("ODDS_API_KEY not set"))?;
        let base_url = env::var("ODDS_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.the-odds-api.com/v4".to_string());

        Ok(Self {
            client: FeedClient::new(
                base_url,
                FeedAuth::QueryParam { name: "apiKey", key: api_key },
            ),
        })
    }

    /// Upcoming events for a league, optionally pinned to one day.
    pub async fn events(
        &self,
        league_key: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<OddsEvent>, FeedError> {
        let mut params = vec![("dateFormat", "iso".to_string())];
        if let Some(d) = date {
            params.push(("commenceTimeFrom", format!("{}T00:00:00Z", d)));
            params.push(("commenceTimeTo", format!("{}T23:59:59Z", d)));
        }
        self.client
            .get_json(&format!("sports/{}/events", league_key), &params)
            .await
    }

    /// Events with bookmaker odds attached. Rate-limited upstream; callers
    /// degrade to events-only when this fails with `RateLimit`.
    pub async fn odds(&self, league_key: &str) -> Result<Vec<OddsEvent>, FeedError> {
        let params = vec![
            ("regions", "eu".to_string()),
            ("markets", "h2h,btts,totals".to_string()),
            ("oddsFormat", "decimal".to_string()),
            ("dateFormat", "iso".to_string()),
        ];
        self.client
            .get_json(&format!("sports/{}/odds", league_key), &params)
            .await
    }
}
