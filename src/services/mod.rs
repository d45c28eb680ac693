pub mod analysis;
pub mod enrichment;
pub mod feed;
pub mod fixture_api;
pub mod league_resolver;
pub mod live;
pub mod odds_api;
pub mod probability;
pub mod reconciler;
pub mod sync;
pub mod team_resolver;
