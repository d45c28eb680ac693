//! Fixture reconciliation: maps each upstream odds event onto exactly one
//! internal match row.
//!
//! Identity is resolved along two paths that must never diverge: the odds
//! event id, and the (home, away, kickoff-date) triple encoded in the
//! default-language slug. The decision itself is a pure function over
//! pre-fetched state; the apply step executes it and recovers creation
//! races by falling back to the lookup that should have preceded the
//! insert.

use anyhow::{anyhow, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db;
use crate::models::{League, Match, MatchStatus, MatchTranslation, Prediction, PublicationStatus};
use crate::services::analysis::{AnalysisGenerator, MatchFacts};
use crate::services::feed::FeedError;
use crate::services::league_resolver::{self, LeagueCache, UpstreamLeague};
use crate::services::odds_api::{OddsApi, OddsEvent};
use crate::services::probability::{extract_btts, extract_h2h, extract_totals, H2hProbabilities};
use crate::services::team_resolver;
use crate::utils::{match_base_slug, match_slug};

/// What happened to one upstream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    Linked,
}

/// The planning half of create-or-link, decided before any write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePlan {
    Update { match_id: String },
    SlugLink { match_id: String },
    Create,
}

/// Pure decision over the two identity paths. The event-id path wins when
/// both hit (they point at the same row when the invariant holds).
pub fn decide(by_event: Option<&Match>, by_slug: Option<&Match>) -> ReconcilePlan {
    match (by_event, by_slug) {
        (Some(m), _) => ReconcilePlan::Update { match_id: m.id.clone() },
        (None, Some(m)) => ReconcilePlan::SlugLink { match_id: m.id.clone() },
        (None, None) => ReconcilePlan::Create,
    }
}

/// Analysis hand-off gate: popular leagues only, and only for fixtures that
/// are newly created or have just moved into an in-play/finished state.
pub fn should_generate_analysis(
    popular_leagues: &[String],
    league_key: &str,
    newly_created: bool,
    previous: Option<MatchStatus>,
    current: MatchStatus,
) -> bool {
    if !popular_leagues.iter().any(|k| k == league_key) {
        return false;
    }
    if newly_created {
        return true;
    }
    match previous {
        Some(prev) => !prev.is_in_play_or_done() && current.is_in_play_or_done(),
        None => false,
    }
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub created: u32,
    pub updated: u32,
    pub linked: u32,
    pub analyzed: u32,
    pub errors: Vec<String>,
}

impl ReconcileReport {
    pub fn synced(&self) -> u32 {
        self.created + self.updated + self.linked
    }

    fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Created => self.created += 1,
            ReconcileOutcome::Updated => self.updated += 1,
            ReconcileOutcome::Linked => self.linked += 1,
        }
    }
}

/// Pre-fetched batch map for one league pass, keyed by odds event id.
struct BatchIndex {
    by_event: HashMap<String, Match>,
}

impl BatchIndex {
    async fn load(pool: &SqlitePool, league_id: &str) -> Result<Self> {
        let mut by_event = HashMap::new();
        for m in db::get_matches_by_league(pool, league_id).await? {
            if let Some(id) = m.odds_event_id.clone() {
                by_event.insert(id, m);
            }
        }
        Ok(Self { by_event })
    }
}

pub struct Reconciler<'a> {
    pool: &'a SqlitePool,
    languages: &'a [String],
    popular_leagues: &'a [String],
    analysis: Option<&'a dyn AnalysisGenerator>,
}

impl<'a> Reconciler<'a> {
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

    /// Full pass for one league: fetch events, merge in odds, reconcile.
    /// Only the events fetch can fail the league as a whole; odds failures
    /// degrade to events-only.
    pub async fn sync_league(
        &self,
        odds_api: &OddsApi,
        cache: &mut LeagueCache,
        league_key: &str,
        date: Option<chrono::NaiveDate>,
    ) -> Result<ReconcileReport, FeedError> {
        let mut events = odds_api.events(league_key, date).await?;

        // The odds endpoint is rate-limited upstream; a fixture sync with
        // no probabilities beats no sync at all.
        match odds_api.odds(league_key).await {
            Ok(priced) => {
                let by_id: HashMap<String, OddsEvent> =
                    priced.into_iter().map(|e| (e.id.clone(), e)).collect();
                for event in &mut events {
                    if let Some(p) = by_id.get(&event.id) {
                        event.bookmakers = p.bookmakers.clone();
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Odds unavailable for {} ({}), syncing without prices", league_key, e);
            }
        }

        Ok(self.reconcile_events(cache, league_key, events).await)
    }

    /// Reconcile a batch of upstream events against the catalog. A single
    /// bad record never aborts the batch; its error is accumulated and
    /// processing continues.
    pub async fn reconcile_events(
        &self,
        cache: &mut LeagueCache,
        league_key: &str,
        events: Vec<OddsEvent>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if events.is_empty() {
            return report;
        }

        let league_name = events
            .iter()
            .map(|e| e.sport_title.as_str())
            .find(|t| !t.is_empty())
            .unwrap_or(league_key)
            .to_string();

        let upstream = UpstreamLeague {
            feed_key: league_key,
            name: &league_name,
            country: None,
            logo_url: None,
        };
        let league = match league_resolver::resolve(self.pool, cache, &upstream, self.languages).await
        {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("League resolution failed for {}: {}", league_key, e);
                report.errors.push(format!("league {}: {}", league_key, e));
                return report;
            }
        };

        let index = match BatchIndex::load(self.pool, &league.id).await {
            Ok(i) => i,
            Err(e) => {
                report.errors.push(format!("league {}: {}", league_key, e));
                return report;
            }
        };

        for event in &events {
            match self.process_event(&league, league_key, &index, event).await {
                Ok((outcome, analyzed)) => {
                    report.record(outcome);
                    if analyzed {
                        report.analyzed += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping event {} ({} vs {}): {}",
                        event.id, event.home_team, event.away_team, e
                    );
                    report.errors.push(format!("event {}: {}", event.id, e));
                }
            }
        }

        report
    }

    async fn process_event(
        &self,
        league: &League,
        league_key: &str,
        index: &BatchIndex,
        event: &OddsEvent,
    ) -> Result<(ReconcileOutcome, bool)> {
        if event.home_team.trim().is_empty() || event.away_team.trim().is_empty() {
            return Err(anyhow!("missing team names"));
        }

        let base = match_base_slug(
            &event.home_team,
            &event.away_team,
            event.commence_time.date_naive(),
        );
        let default_slug = match_slug(&base, self.default_language());

        let by_event = index.by_event.get(&event.id);
        let by_slug =
            db::get_match_by_translation_slug(self.pool, self.default_language(), &default_slug)
                .await?;

        let plan = decide(by_event, by_slug.as_ref());
        let probabilities = extract_h2h(event);

        let outcome = match plan {
            ReconcilePlan::Update { match_id } => {
                self.apply_update(&match_id, event, probabilities.as_ref()).await?;
                ReconcileOutcome::Updated
            }
            ReconcilePlan::SlugLink { match_id } => {
                // The slug row may already carry an event id from an earlier
                // provider run; never overwrite it.
                let already_linked = by_slug
                    .as_ref()
                    .and_then(|m| m.odds_event_id.as_deref())
                    .is_some();
                if !already_linked {
                    db::attach_odds_event_id(self.pool, &match_id, &event.id).await?;
                }
                self.apply_update(&match_id, event, probabilities.as_ref()).await?;
                tracing::info!(
                    "Linked event {} to existing fixture {} via slug",
                    event.id, match_id
                );
                ReconcileOutcome::Linked
            }
            ReconcilePlan::Create => {
                self.create_or_link(league, event, &base, probabilities.as_ref()).await?
            }
        };

        // Transition-triggered hand-off lives in the live pass, the only
        // place a status change is observable; here only creations qualify.
        let newly_created = outcome == ReconcileOutcome::Created;
        let mut analyzed = false;
        if should_generate_analysis(
            self.popular_leagues,
            league_key,
            newly_created,
            None,
            MatchStatus::Scheduled,
        ) {
            analyzed = self
                .generate_analysis(event, &event.sport_title, probabilities.as_ref(), &default_slug)
                .await;
        }

        Ok((outcome, analyzed))
    }

    async fn apply_update(
        &self,
        match_id: &str,
        event: &OddsEvent,
        probabilities: Option<&H2hProbabilities>,
    ) -> Result<()> {
        if let Some(existing) = db::get_match_by_id(self.pool, match_id).await? {
            if existing.kickoff != event.commence_time {
                db::update_match_kickoff(self.pool, match_id, event.commence_time).await?;
            }
        }
        self.upsert_probabilities(match_id, event, probabilities).await
    }

    /// `None` probabilities mean "no qualifying market": the existing
    /// prediction is left alone, never zeroed.
    async fn upsert_probabilities(
        &self,
        match_id: &str,
        event: &OddsEvent,
        probabilities: Option<&H2hProbabilities>,
    ) -> Result<()> {
        let Some(h2h) = probabilities else { return Ok(()) };
        let btts = extract_btts(event);
        let totals = extract_totals(event);

        db::upsert_prediction(
            self.pool,
            &Prediction {
                match_id: match_id.to_string(),
                home_pct: h2h.home,
                draw_pct: h2h.draw,
                away_pct: h2h.away,
                btts_yes_pct: btts.map(|p| p.yes),
                btts_no_pct: btts.map(|p| p.no),
                over25_pct: totals.map(|p| p.yes),
                under25_pct: totals.map(|p| p.no),
                manual_override: false,
                updated_at: Utc::now(),
            },
        )
        .await
    }

    /// CREATE path with race recovery: a unique-constraint conflict during
    /// creation means another writer claimed the identity first, so the
    /// fixture is linked to that row instead of failing the batch.
    async fn create_or_link(
        &self,
        league: &League,
        event: &OddsEvent,
        base_slug: &str,
        probabilities: Option<&H2hProbabilities>,
    ) -> Result<ReconcileOutcome> {
        let home = team_resolver::resolve(self.pool, &event.home_team, None, self.languages).await?;
        let away = team_resolver::resolve(self.pool, &event.away_team, None, self.languages).await?;

        let now = Utc::now();
        let m = Match {
            id: Uuid::new_v4().to_string(),
            odds_event_id: Some(event.id.clone()),
            fixture_api_id: None,
            league_id: league.id.clone(),
            home_team_id: Some(home.id),
            away_team_id: Some(away.id),
            home_team_name: event.home_team.clone(),
            away_team_name: event.away_team.clone(),
            kickoff: event.commence_time,
            status: MatchStatus::Scheduled,
            home_score: None,
            away_score: None,
            elapsed: None,
            stats_json: None,
            lineups_json: None,
            h2h_json: None,
            standings_json: None,
            created_at: now,
            updated_at: now,
        };

        match db::insert_match(self.pool, &m).await {
            Ok(()) => {}
            Err(e) if db::is_unique_violation(&e) => {
                return self.link_after_conflict(event, base_slug, probabilities).await;
            }
            Err(e) => return Err(e.into()),
        }

        let display_name = format!("{} vs {}", event.home_team, event.away_team);
        for language in self.languages {
            let tr = MatchTranslation {
                id: Uuid::new_v4().to_string(),
                match_id: m.id.clone(),
                language: language.clone(),
                name: display_name.clone(),
                slug: match_slug(base_slug, language),
                analysis: None,
                publication_status: PublicationStatus::Draft,
                seo_title: display_name.clone(),
                seo_description: format!(
                    "{} preview with win probabilities and live score updates.",
                    display_name
                ),
            };
            match db::insert_match_translation(self.pool, &tr).await {
                Ok(()) => {}
                Err(e) if db::is_unique_violation(&e) => {
                    // Two fixtures raced to claim the same slug. Drop our
                    // half-created row and link to the winner.
                    db::delete_match(self.pool, &m.id).await?;
                    return self.link_after_conflict(event, base_slug, probabilities).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.upsert_probabilities(&m.id, event, probabilities).await?;
        tracing::info!("Created fixture {} ({})", display_name, m.id);
        Ok(ReconcileOutcome::Created)
    }

    async fn link_after_conflict(
        &self,
        event: &OddsEvent,
        base_slug: &str,
        probabilities: Option<&H2hProbabilities>,
    ) -> Result<ReconcileOutcome> {
        let default_slug = match_slug(base_slug, self.default_language());
        let existing = match db::get_match_by_translation_slug(
            self.pool,
            self.default_language(),
            &default_slug,
        )
        .await?
        {
            Some(m) => m,
            None => db::get_match_by_odds_event_id(self.pool, &event.id)
                .await?
                .ok_or_else(|| anyhow!("conflict on event {} but no row to link", event.id))?,
        };

        if existing.odds_event_id.is_none() {
            db::attach_odds_event_id(self.pool, &existing.id, &event.id).await?;
        }
        self.upsert_probabilities(&existing.id, event, probabilities).await?;
        tracing::info!("Recovered creation conflict, linked event {} to {}", event.id, existing.id);
        Ok(ReconcileOutcome::Linked)
    }

    /// Best-effort hand-off to the content collaborator. Failures are
    /// logged and swallowed; the sync must function without prose.
    async fn generate_analysis(
        &self,
        event: &OddsEvent,
        league_name: &str,
        probabilities: Option<&H2hProbabilities>,
        default_slug: &str,
    ) -> bool {
        let Some(generator) = self.analysis else { return false };

        let Ok(Some(m)) = db::get_match_by_translation_slug(
            self.pool,
            self.default_language(),
            default_slug,
        )
        .await
        else {
            return false;
        };

        let facts = MatchFacts::new(
            &event.home_team,
            &event.away_team,
            league_name,
            event.commence_time,
            probabilities,
            m.h2h_json.clone(),
        );

        let mut any = false;
        for language in self.languages {
            match generator.generate(&facts, language).await {
                Ok(html) => {
                    if let Err(e) =
                        db::set_translation_analysis(self.pool, &m.id, language, &html).await
                    {
                        tracing::warn!("Failed to store analysis for {} [{}]: {}", m.id, language, e);
                    } else {
                        any = true;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Analysis collaborator failed for {} [{}]: {}",
                        m.id, language, e
                    );
                }
            }
        }
        any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::services::odds_api::{Bookmaker, Market, Outcome};
    use chrono::TimeZone;

    fn kickoff() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 26, 19, 0, 0).unwrap()
    }

    fn event(id: &str, home: &str, away: &str) -> OddsEvent {
        OddsEvent {
            id: id.to_string(),
            sport_key: "soccer_epl".to_string(),
            sport_title: "Premier League".to_string(),
            commence_time: kickoff(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            bookmakers: vec![Bookmaker {
                key: "bookie".to_string(),
                title: "Bookie".to_string(),
                markets: vec![Market {
                    key: "h2h".to_string(),
                    outcomes: vec![
                        Outcome { name: home.to_string(), price: 1.80, point: None },
                        Outcome { name: "Draw".to_string(), price: 3.40, point: None },
                        Outcome { name: away.to_string(), price: 4.20, point: None },
                    ],
                }],
            }],
        }
    }

    fn languages() -> Vec<String> {
        vec!["en".to_string(), "es".to_string()]
    }

    #[test]
    fn decide_prefers_event_id_path() {
        assert_eq!(decide(None, None), ReconcilePlan::Create);
    }

    #[test]
    fn analysis_gate_requires_popular_league() {
        let popular = vec!["soccer_epl".to_string()];
        assert!(should_generate_analysis(&popular, "soccer_epl", true, None, MatchStatus::Scheduled));
        assert!(!should_generate_analysis(&popular, "soccer_laliga", true, None, MatchStatus::Scheduled));
        // Transition into live counts, staying live does not.
        assert!(should_generate_analysis(
            &popular, "soccer_epl", false, Some(MatchStatus::Scheduled), MatchStatus::Live
        ));
        assert!(!should_generate_analysis(
            &popular, "soccer_epl", false, Some(MatchStatus::Live), MatchStatus::Live
        ));
        assert!(!should_generate_analysis(
            &popular, "soccer_epl", false, None, MatchStatus::Live
        ));
    }

    #[tokio::test]
    async fn reconciling_twice_is_idempotent() {
        let pool = test_pool().await;
        let langs = languages();
        let popular: Vec<String> = vec![];
        let reconciler = Reconciler::new(&pool, &langs, &popular, None);
        let mut cache = LeagueCache::new();

        let batch = vec![event("ev-1", "Arsenal", "Chelsea")];
        let first = reconciler.reconcile_events(&mut cache, "soccer_epl", batch.clone()).await;
        assert_eq!(first.created, 1);
        assert!(first.errors.is_empty());

        let second = reconciler.reconcile_events(&mut cache, "soccer_epl", batch).await;
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 1);

        let m = db::get_match_by_odds_event_id(&pool, "ev-1").await.unwrap().unwrap();
        let p = db::get_prediction(&pool, &m.id).await.unwrap().unwrap();
        assert_eq!((p.home_pct, p.draw_pct, p.away_pct), (51, 27, 22));
    }

    #[tokio::test]
    async fn slug_first_then_event_id_attaches_to_same_row() {
        let pool = test_pool().await;
        let langs = languages();
        let popular: Vec<String> = vec![];
        let reconciler = Reconciler::new(&pool, &langs, &popular, None);
        let mut cache = LeagueCache::new();

        // First discovery: the same real-world fixture under a different
        // upstream event id and capitalization.
        let first = reconciler
            .reconcile_events(&mut cache, "soccer_epl", vec![event("ev-a", "ARSENAL", "CHELSEA")])
            .await;
        assert_eq!(first.created, 1);

        // Re-sync under a fresh event id: identical slug, so it links.
        let second = reconciler
            .reconcile_events(&mut cache, "soccer_epl", vec![event("ev-b", "Arsenal", "Chelsea")])
            .await;
        assert_eq!(second.linked + second.updated, 1);
        assert_eq!(second.created, 0);

        let by_slug = db::get_match_by_translation_slug(
            &pool, "en", "arsenal-vs-chelsea-2026-08-26-en",
        )
        .await
        .unwrap();
        assert!(by_slug.is_some());
    }

    #[tokio::test]
    async fn slug_link_keeps_the_first_event_id() {
        let pool = test_pool().await;
        let langs = languages();
        let popular: Vec<String> = vec![];
        let reconciler = Reconciler::new(&pool, &langs, &popular, None);

        let mut cache = LeagueCache::new();
        let first = reconciler
            .reconcile_events(&mut cache, "soccer_epl", vec![event("ev-a", "Arsenal", "Chelsea")])
            .await;
        assert_eq!(first.created, 1);

        // The same fixture re-surfaces under a fresh event id: it links by
        // slug, but the row keeps the id it was first claimed under.
        let second = reconciler
            .reconcile_events(&mut cache, "soccer_epl", vec![event("ev-b", "Arsenal", "Chelsea")])
            .await;
        assert_eq!(second.linked, 1);
        assert!(second.errors.is_empty());

        let m = db::get_match_by_translation_slug(&pool, "en", "arsenal-vs-chelsea-2026-08-26-en")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(m.odds_event_id.as_deref(), Some("ev-a"));
    }

    #[tokio::test]
    async fn slug_race_during_creation_drops_own_row_and_links() {
        let pool = test_pool().await;
        let langs = languages();
        let popular: Vec<String> = vec![];
        let reconciler = Reconciler::new(&pool, &langs, &popular, None);

        let mut seed_cache = LeagueCache::new();
        let league = league_resolver::resolve(
            &pool,
            &mut seed_cache,
            &UpstreamLeague {
                feed_key: "soccer_epl",
                name: "Premier League",
                country: None,
                logo_url: None,
            },
            &langs,
        )
        .await
        .unwrap();

        // A competitor already owns the default-language slug but carries
        // no event id, so the insert succeeds and the race surfaces on the
        // translation insert instead.
        let now = Utc::now();
        db::insert_match(
            &pool,
            &Match {
                id: "rival".to_string(),
                odds_event_id: None,
                fixture_api_id: None,
                league_id: league.id.clone(),
                home_team_id: None,
                away_team_id: None,
                home_team_name: "Arsenal".to_string(),
                away_team_name: "Chelsea".to_string(),
                kickoff: kickoff(),
                status: MatchStatus::Scheduled,
                home_score: None,
                away_score: None,
                elapsed: None,
                stats_json: None,
                lineups_json: None,
                h2h_json: None,
                standings_json: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        db::insert_match_translation(
            &pool,
            &MatchTranslation {
                id: "rival-en".to_string(),
                match_id: "rival".to_string(),
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

        let outcome = reconciler
            .create_or_link(
                &league,
                &event("ev-9", "Arsenal", "Chelsea"),
                "arsenal-vs-chelsea-2026-08-26",
                None,
            )
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Linked);

        // The half-created row is gone; the competitor survives and picks
        // up the event id it was missing.
        let all = db::get_matches_by_league(&pool, &league.id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "rival");
        assert_eq!(all[0].odds_event_id.as_deref(), Some("ev-9"));
    }

    #[tokio::test]
    async fn creation_conflict_links_instead_of_failing() {
        let pool = test_pool().await;
        let langs = languages();
        let popular: Vec<String> = vec![];
        let reconciler = Reconciler::new(&pool, &langs, &popular, None);

        // Seed a row that already claims the event id but has no
        // translations, so neither lookup path can see it and the
        // reconciler walks straight into the CREATE path.
        let mut seed_cache = LeagueCache::new();
        let league = league_resolver::resolve(
            &pool,
            &mut seed_cache,
            &UpstreamLeague {
                feed_key: "soccer_epl",
                name: "Premier League",
                country: None,
                logo_url: None,
            },
            &langs,
        )
        .await
        .unwrap();
        let now = Utc::now();
        db::insert_match(
            &pool,
            &Match {
                id: "pre-existing".to_string(),
                odds_event_id: Some("ev-1".to_string()),
                fixture_api_id: None,
                league_id: league.id.clone(),
                home_team_id: None,
                away_team_id: None,
                home_team_name: "Arsenal".to_string(),
                away_team_name: "Chelsea".to_string(),
                kickoff: kickoff(),
                status: MatchStatus::Scheduled,
                home_score: None,
                away_score: None,
                elapsed: None,
                stats_json: None,
                lineups_json: None,
                h2h_json: None,
                standings_json: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        let stale_index = BatchIndex { by_event: HashMap::new() };
        let (outcome, _) = reconciler
            .process_event(&league, "soccer_epl", &stale_index, &event("ev-1", "Arsenal", "Chelsea"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Linked);

        let all = db::get_matches_by_league(&pool, &league.id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "pre-existing");
    }

    #[tokio::test]
    async fn one_bad_record_does_not_abort_the_batch() {
        let pool = test_pool().await;
        let langs = languages();
        let popular: Vec<String> = vec![];
        let reconciler = Reconciler::new(&pool, &langs, &popular, None);
        let mut cache = LeagueCache::new();

        let batch = vec![
            event("ev-1", "Arsenal", "Chelsea"),
            event("ev-2", "", "Liverpool"),
            event("ev-3", "Everton", "Fulham"),
        ];
        let report = reconciler.reconcile_events(&mut cache, "soccer_epl", batch).await;
        assert_eq!(report.created, 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("ev-2"));
    }
}
