//! Content-generation collaborator: structured match facts in, HTML prose
//! out. Treated as fallible and slow by contract; every caller must be able
//! to skip analysis when it errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::env;
use std::time::Duration;

use crate::services::probability::H2hProbabilities;

#[derive(Debug, Clone, Serialize)]
pub struct MatchFacts {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub kickoff: DateTime<Utc>,
    pub home_pct: Option<i64>,
    pub draw_pct: Option<i64>,
    pub away_pct: Option<i64>,
    pub h2h_summary: Option<String>,
}

impl MatchFacts {
    pub fn new(
        home_team: &str,
        away_team: &str,
        league: &str,
        kickoff: DateTime<Utc>,
        probabilities: Option<&H2hProbabilities>,
        h2h_summary: Option<String>,
    ) -> Self {
        Self {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            league: league.to_string(),
            kickoff,
            home_pct: probabilities.map(|p| p.home),
            draw_pct: probabilities.map(|p| p.draw),
            away_pct: probabilities.map(|p| p.away),
            h2h_summary,
        }
    }
}

#[async_trait]
pub trait AnalysisGenerator: Send + Sync {
    /// Returns HTML prose for the given facts and target language.
    async fn generate(&self, facts: &MatchFacts, language: &str) -> anyhow::Result<String>;
}

pub struct HttpAnalysisGenerator {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpAnalysisGenerator {
    pub fn from_env() -> Option<Self> {
        let endpoint = env::var("ANALYSIS_API_URL").ok()?;
        Some(Self { http: reqwest::Client::new(), endpoint })
    }
}

#[derive(Serialize)]
struct AnalysisRequest<'a> {
    facts: &'a MatchFacts,
    language: &'a str,
}

#[derive(serde::Deserialize)]
struct AnalysisResponse {
    html: String,
}

#[async_trait]
impl AnalysisGenerator for HttpAnalysisGenerator {
    async fn generate(&self, facts: &MatchFacts, language: &str) -> anyhow::Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&AnalysisRequest { facts, language })
            // Prose generation is slow; give it more room than feed calls.
            .timeout(Duration::from_secs(60))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("analysis collaborator returned HTTP {}", response.status());
        }

        let body: AnalysisResponse = response.json().await?;
        Ok(body.html)
    }
}
