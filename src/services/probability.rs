//! Converts raw bookmaker decimal odds into normalized percentage
//! probabilities. The first bookmaker offering a market wins; `None` means
//! "no qualifying market" and must be treated as no-update by callers,
//! never as zero probabilities.

use crate::services::odds_api::{Market, OddsEvent};
use crate::utils::{implied_probability, names_match, normalize_to_percentages};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct H2hProbabilities {
    pub home: i64,
    pub draw: i64,
    pub away: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoWayProbabilities {
    pub yes: i64,
    pub no: i64,
}

fn first_market<'a>(event: &'a OddsEvent, key: &str) -> Option<&'a Market> {
    event
        .bookmakers
        .iter()
        .flat_map(|bk| bk.markets.iter())
        .find(|m| m.key == key)
}

/// Head-to-head market → {home, draw, away} percentages summing to ~100.
pub fn extract_h2h(event: &OddsEvent) -> Option<H2hProbabilities> {
    let market = first_market(event, "h2h")?;

    let home = market
        .outcomes
        .iter()
        .find(|o| names_match(&o.name, &event.home_team))
        .and_then(|o| implied_probability(o.price))?;
    let away = market
        .outcomes
        .iter()
        .find(|o| names_match(&o.name, &event.away_team))
        .and_then(|o| implied_probability(o.price))?;
    let draw = market
        .outcomes
        .iter()
        .find(|o| o.name.eq_ignore_ascii_case("draw"))
        .and_then(|o| implied_probability(o.price))?;

    let pct = normalize_to_percentages(&[home, draw, away]);
    Some(H2hProbabilities { home: pct[0], draw: pct[1], away: pct[2] })
}

/// Both-teams-to-score market → {yes, no}.
pub fn extract_btts(event: &OddsEvent) -> Option<TwoWayProbabilities> {
    let market = first_market(event, "btts")?;
    extract_two_way(market, "yes", "no")
}

/// Totals market, 2.5-goal line only → {over, under}.
pub fn extract_totals(event: &OddsEvent) -> Option<TwoWayProbabilities> {
    let market = event
        .bookmakers
        .iter()
        .flat_map(|bk| bk.markets.iter())
        .find(|m| {
            m.key == "totals" && m.outcomes.iter().any(|o| o.point == Some(2.5))
        })?;

    let over = market
        .outcomes
        .iter()
        .find(|o| o.point == Some(2.5) && o.name.eq_ignore_ascii_case("over"))
        .and_then(|o| implied_probability(o.price))?;
    let under = market
        .outcomes
        .iter()
        .find(|o| o.point == Some(2.5) && o.name.eq_ignore_ascii_case("under"))
        .and_then(|o| implied_probability(o.price))?;

    let pct = normalize_to_percentages(&[over, under]);
    Some(TwoWayProbabilities { yes: pct[0], no: pct[1] })
}

fn extract_two_way(market: &Market, yes_name: &str, no_name: &str) -> Option<TwoWayProbabilities> {
    let yes = market
        .outcomes
        .iter()
        .find(|o| o.name.eq_ignore_ascii_case(yes_name))
        .and_then(|o| implied_probability(o.price))?;
    let no = market
        .outcomes
        .iter()
        .find(|o| o.name.eq_ignore_ascii_case(no_name))
        .and_then(|o| implied_probability(o.price))?;

    let pct = normalize_to_percentages(&[yes, no]);
    Some(TwoWayProbabilities { yes: pct[0], no: pct[1] })
}
