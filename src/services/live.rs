//! Live-state refresh: a lighter pass that only updates score, minute and
//! status on fixtures the reconciler already discovered. Never creates
//! matches; discovery and refresh stay separate responsibilities.
//!
//! This pass is also the only place a status transition is observable (the
//! odds feed carries no status), so transition-triggered analysis hand-off
//! happens here; the reconciler covers newly created fixtures.

use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::HashSet;

use crate::db;
use crate::models::{Match, MatchStatus};
use crate::services::analysis::{AnalysisGenerator, MatchFacts};
use crate::services::fixture_api::{map_status, FixtureApi, FixtureRecord};
use crate::services::probability::H2hProbabilities;
use crate::services::reconciler::should_generate_analysis;
use crate::utils::{name_similarity, names_match};

#[derive(Debug, Default)]
pub struct LiveReport {
    pub updated: u32,
    pub unmatched: u32,
    pub analyzed: u32,
    pub errors: Vec<String>,
}

/// Picks the known match a live record refers to. Fuzzy name equality on
/// both teams, restricted to open (scheduled/live) fixtures; when several
/// candidates pass, the highest combined similarity wins.
pub fn find_target<'a>(record: &FixtureRecord, candidates: &'a [Match]) -> Option<&'a Match> {
    let home = &record.teams.home.name;
    let away = &record.teams.away.name;

    candidates
        .iter()
        .filter(|m| names_match(&m.home_team_name, home) && names_match(&m.away_team_name, away))
        .max_by(|a, b| {
            let score = |m: &Match| {
                name_similarity(&m.home_team_name, home) + name_similarity(&m.away_team_name, away)
            };
            score(a).partial_cmp(&score(b)).unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// The live and by-date endpoints overlap around kickoff and full time;
/// keep the first sighting of each fixture id so no record is applied
/// twice in one pass.
fn dedup_by_fixture_id(records: &mut Vec<FixtureRecord>) {
    let mut seen = HashSet::new();
    records.retain(|r| seen.insert(r.fixture.id));
}

pub struct LiveUpdater<'a> {
    pool: &'a SqlitePool,
    languages: &'a [String],
    popular_leagues: &'a [String],
    analysis: Option<&'a dyn AnalysisGenerator>,
}

impl<'a> LiveUpdater<'a> {
    pub fn new(
        pool: &'a SqlitePool,
        languages: &'a [String],
        popular_leagues: &'a [String],
        analysis: Option<&'a dyn AnalysisGenerator>,
    ) -> Self {
        Self { pool, languages, popular_leagues, analysis }
    }

    fn default_language(&self) -> &str {
        self.languages.first().map(String::as_str).unwrap_or("en")
    }

    /// Fetches live plus today's fixtures and applies each to a known
    /// match. Records without a fuzzy match are counted and skipped, never
    /// created.
    pub async fn refresh(&self, api: &FixtureApi) -> Result<LiveReport> {
        let mut records = api.live_fixtures().await?;
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        match api.fixtures_by_date(&today).await {
            Ok(mut by_date) => records.append(&mut by_date),
            Err(e) => tracing::warn!("Date fixture fetch failed, live-only pass: {}", e),
        }
        dedup_by_fixture_id(&mut records);

        let candidates = db::get_open_matches(self.pool).await?;
        let mut report = LiveReport::default();

        for record in &records {
            match self.apply(api, record, &candidates).await {
                Ok(Some(analyzed)) => {
                    report.updated += 1;
                    if analyzed {
                        report.analyzed += 1;
                    }
                }
                Ok(None) => report.unmatched += 1,
                Err(e) => {
                    tracing::warn!("Live update failed for fixture {}: {}", record.fixture.id, e);
                    report.errors.push(format!("fixture {}: {}", record.fixture.id, e));
                }
            }
        }

        tracing::info!(
            "Live pass: {} updated, {} unmatched, {} analyzed, {} errors",
            report.updated, report.unmatched, report.analyzed, report.errors.len()
        );
        Ok(report)
    }

    /// `None` means no candidate matched; `Some(analyzed)` means the match
    /// was updated, with the flag reporting an analysis hand-off.
    async fn apply(
        &self,
        api: &FixtureApi,
        record: &FixtureRecord,
        candidates: &[Match],
    ) -> Result<Option<bool>> {
        let Some(target) = find_target(record, candidates) else {
            return Ok(None);
        };

        let status = map_status(&record.fixture.status.short);
        db::update_live_state(
            self.pool,
            &target.id,
            status,
            record.goals.home,
            record.goals.away,
            record.fixture.status.elapsed,
        )
        .await?;

        if target.fixture_api_id.is_none() {
            if let Err(e) = db::set_fixture_api_id(self.pool, &target.id, record.fixture.id).await {
                // Another open match may already hold this id; keep the
                // score update, skip the link.
                if db::is_unique_violation(&e) {
                    tracing::warn!(
                        "Fixture id {} already linked elsewhere, skipping backfill for {}",
                        record.fixture.id, target.id
                    );
                } else {
                    return Err(e.into());
                }
            }
        }

        let mut analyzed = false;
        if target.status != status && status.is_in_play_or_done() {
            analyzed = self.handle_transition(target, status).await;
            if let Err(e) = super::enrichment::enrich_match(self.pool, api, target, record).await {
                tracing::warn!("Enrichment skipped for {}: {}", target.id, e);
            }
        }

        Ok(Some(analyzed))
    }

    /// Transition-triggered analysis hand-off: popular leagues only, and
    /// only on the observed move into an in-play/finished state. Failures
    /// are logged and swallowed; the score update already happened.
    async fn handle_transition(&self, target: &Match, status: MatchStatus) -> bool {
        let Some(generator) = self.analysis else { return false };
        let Ok(Some(league)) = db::get_league_by_id(self.pool, &target.league_id).await else {
            return false;
        };
        let Some(key) = league.odds_feed_key.as_deref() else { return false };
        if !should_generate_analysis(self.popular_leagues, key, false, Some(target.status), status) {
            return false;
        }

        let league_name = db::get_league_name(self.pool, &target.league_id, self.default_language())
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| key.to_string());
        let probabilities = db::get_prediction(self.pool, &target.id)
            .await
            .ok()
            .flatten()
            .map(|p| H2hProbabilities { home: p.home_pct, draw: p.draw_pct, away: p.away_pct });

        let facts = MatchFacts::new(
            &target.home_team_name,
            &target.away_team_name,
            &league_name,
            target.kickoff,
            probabilities.as_ref(),
            target.h2h_json.clone(),
        );

        let mut any = false;
        for language in self.languages {
            match generator.generate(&facts, language).await {
                Ok(html) => {
                    if let Err(e) =
                        db::set_translation_analysis(self.pool, &target.id, language, &html).await
                    {
                        tracing::warn!(
                            "Failed to store analysis for {} [{}]: {}",
                            target.id, language, e
                        );
                    } else {
                        any = true;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Analysis collaborator failed for {} [{}]: {}",
                        target.id, language, e
                    );
                }
            }
        }

        if any {
            tracing::info!(
                "Generated analysis for {} on transition to {}",
                target.id,
                status.as_str()
            );
        }
        any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::{MatchTranslation, PublicationStatus};
    use crate::services::fixture_api::{
        FixtureInfo, FixtureLeague, FixtureStatus, FixtureTeam, FixtureTeams, Goals,
    };
    use crate::services::league_resolver::{self, LeagueCache, UpstreamLeague};
    use async_trait::async_trait;
    use chrono::Utc;
    use sqlx::Row;
    use std::sync::Mutex;

    fn record(home: &str, away: &str) -> FixtureRecord {
        FixtureRecord {
            fixture: FixtureInfo {
                id: 42,
                date: "2026-08-26T19:00:00Z".to_string(),
                status: FixtureStatus { short: "2H".to_string(), elapsed: Some(67) },
            },
            league: FixtureLeague::default(),
            goals: Goals { home: Some(2), away: Some(1) },
            teams: FixtureTeams {
                home: FixtureTeam { id: 1, name: home.to_string(), logo: None },
                away: FixtureTeam { id: 2, name: away.to_string(), logo: None },
            },
        }
    }

    fn known(id: &str, home: &str, away: &str, status: MatchStatus) -> Match {
        Match {
            id: id.to_string(),
            odds_event_id: None,
            fixture_api_id: None,
            league_id: "l1".to_string(),
            home_team_id: None,
            away_team_id: None,
            home_team_name: home.to_string(),
            away_team_name: away.to_string(),
            kickoff: Utc::now(),
            status,
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

    struct RecordingGenerator {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AnalysisGenerator for RecordingGenerator {
        async fn generate(&self, facts: &MatchFacts, language: &str) -> anyhow::Result<String> {
            self.calls.lock().unwrap().push(language.to_string());
            Ok(format!("<p>{} vs {}</p>", facts.home_team, facts.away_team))
        }
    }

    #[test]
    fn fuzzy_match_links_across_naming_conventions() {
        let candidates = vec![
            known("m1", "Paris Saint-Germain", "Olympique de Marseille", MatchStatus::Scheduled),
            known("m2", "Arsenal", "Chelsea", MatchStatus::Scheduled),
        ];
        let target = find_target(&record("Paris SG", "Marseille"), &candidates);
        assert_eq!(target.map(|m| m.id.as_str()), Some("m1"));
    }

    #[test]
    fn ambiguous_candidates_resolve_by_similarity() {
        let candidates = vec![
            known("m1", "Manchester United", "Everton", MatchStatus::Scheduled),
            known("m2", "Manchester", "Everton", MatchStatus::Scheduled),
        ];
        // Both pass the containment rule; the closer name wins.
        let target = find_target(&record("Manchester United", "Everton"), &candidates);
        assert_eq!(target.map(|m| m.id.as_str()), Some("m1"));
    }

    #[test]
    fn no_candidate_means_no_creation() {
        let candidates = vec![known("m1", "Arsenal", "Chelsea", MatchStatus::Scheduled)];
        assert!(find_target(&record("Bayern", "Dortmund"), &candidates).is_none());
    }

    #[test]
    fn overlapping_feeds_apply_each_fixture_once() {
        // Same fixture id from the live and by-date endpoints.
        let mut records = vec![
            record("Arsenal", "Chelsea"),
            record("Arsenal", "Chelsea"),
            record("Bayern", "Dortmund"),
        ];
        records[2].fixture.id = 43;

        dedup_by_fixture_id(&mut records);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fixture.id, 42);
        assert_eq!(records[1].fixture.id, 43);
    }

    #[tokio::test]
    async fn transition_into_live_generates_analysis() {
        let pool = test_pool().await;
        let languages = vec!["en".to_string()];
        let popular = vec!["soccer_epl".to_string()];

        let mut cache = LeagueCache::new();
        let league = league_resolver::resolve(
            &pool,
            &mut cache,
            &UpstreamLeague {
                feed_key: "soccer_epl",
                name: "Premier League",
                country: None,
                logo_url: None,
            },
            &languages,
        )
        .await
        .unwrap();

        let mut scheduled = known("m1", "Arsenal", "Chelsea", MatchStatus::Scheduled);
        scheduled.league_id = league.id.clone();
        db::insert_match(&pool, &scheduled).await.unwrap();
        db::insert_match_translation(
            &pool,
            &MatchTranslation {
                id: "m1-en".to_string(),
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

        let generator = RecordingGenerator { calls: Mutex::new(Vec::new()) };
        let updater = LiveUpdater::new(&pool, &languages, &popular, Some(&generator));

        let target = db::get_match_by_id(&pool, "m1").await.unwrap().unwrap();
        assert!(updater.handle_transition(&target, MatchStatus::Live).await);
        assert_eq!(*generator.calls.lock().unwrap(), vec!["en".to_string()]);

        let stored: Option<String> =
            sqlx::query("SELECT analysis FROM match_translations WHERE match_id = 'm1'")
                .fetch_one(&pool)
                .await
                .unwrap()
                .get("analysis");
        assert_eq!(stored.as_deref(), Some("<p>Arsenal vs Chelsea</p>"));
    }

    #[tokio::test]
    async fn transition_outside_popular_leagues_skips_analysis() {
        let pool = test_pool().await;
        let languages = vec!["en".to_string()];
        let popular = vec!["soccer_spain_la_liga".to_string()];

        let mut cache = LeagueCache::new();
        let league = league_resolver::resolve(
            &pool,
            &mut cache,
            &UpstreamLeague {
                feed_key: "soccer_epl",
                name: "Premier League",
                country: None,
                logo_url: None,
            },
            &languages,
        )
        .await
        .unwrap();

        let mut scheduled = known("m1", "Arsenal", "Chelsea", MatchStatus::Scheduled);
        scheduled.league_id = league.id.clone();
        db::insert_match(&pool, &scheduled).await.unwrap();

        let generator = RecordingGenerator { calls: Mutex::new(Vec::new()) };
        let updater = LiveUpdater::new(&pool, &languages, &popular, Some(&generator));

        let target = db::get_match_by_id(&pool, "m1").await.unwrap().unwrap();
        assert!(!updater.handle_transition(&target, MatchStatus::Live).await);
        assert!(generator.calls.lock().unwrap().is_empty());
    }
}
