use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::{self, create_pool};
use crate::models::{ApiResponse, UpcomingMatchWithPrediction};
use crate::services::sync;

/// A background sync request emitted onto the work queue. Senders never
/// await a result; the worker logs failures and moves on.
#[derive(Debug, Clone, Copy)]
struct SyncRequest {
    date: Option<NaiveDate>,
}

#[derive(Clone)]
struct AppState {
    pool: SqlitePool,
    sync_tx: mpsc::Sender<SyncRequest>,
}

pub async fn serve(port: u16) -> anyhow::Result<()> {
    let pool = create_pool().await?;
    db::init_database_with_pool(&pool).await?;

    // Single worker drains the queue so background syncs never run
    // concurrently with each other.
    let (sync_tx, mut sync_rx) = mpsc::channel::<SyncRequest>(4);
    let worker_pool = pool.clone();
    tokio::spawn(async move {
        while let Some(request) = sync_rx.recv().await {
            tracing::info!("Background sync starting");
            match sync::run_full_sync(&worker_pool, request.date, false).await {
                Ok(outcome) => tracing::info!(
                    "Background sync done: {} synced, {} errors",
                    outcome.synced,
                    outcome.errors.len()
                ),
                Err(e) => tracing::error!("Background sync failed: {}", e),
            }
        }
    });

    let app = create_router().with_state(AppState { pool, sync_tx });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("fixturesync API listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/sync", get(trigger_sync_handler))
        .route("/sync/live", get(trigger_live_handler))
        .route("/matches/upcoming", get(upcoming_matches_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("fixturesync is running"))
}

// GET /sync?date=YYYY-MM-DD&analyze=true — administrative trigger.
// Individual fixture failures come back as data; only orchestration-level
// failures produce a non-2xx.

#[derive(Deserialize)]
struct SyncQuery {
    date: Option<String>,
    analyze: Option<bool>,
}

#[derive(Serialize)]
struct SyncResponse {
    success: bool,
    synced: u32,
    analyzed: u32,
    errors: Vec<String>,
}

async fn trigger_sync_handler(
    State(state): State<AppState>,
    Query(params): Query<SyncQuery>,
) -> Result<Json<SyncResponse>, (StatusCode, Json<ApiResponse<()>>)> {
    let date = match params.date.as_deref().map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d")) {
        None => None,
        Some(Ok(d)) => Some(d),
        Some(Err(_)) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("date must be YYYY-MM-DD".to_string())),
            ));
        }
    };

    match sync::run_full_sync(&state.pool, date, params.analyze.unwrap_or(false)).await {
        Ok(outcome) => Ok(Json(SyncResponse {
            success: true,
            synced: outcome.synced,
            analyzed: outcome.analyzed,
            errors: outcome.errors,
        })),
        Err(e) => {
            tracing::error!("Sync trigger failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            ))
        }
    }
}

async fn trigger_live_handler(
    State(state): State<AppState>,
) -> Result<Json<SyncResponse>, (StatusCode, Json<ApiResponse<()>>)> {
    match sync::run_live_refresh(&state.pool).await {
        Ok(outcome) => Ok(Json(SyncResponse {
            success: true,
            synced: outcome.synced,
            analyzed: outcome.analyzed,
            errors: outcome.errors,
        })),
        Err(e) => {
            tracing::error!("Live refresh trigger failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            ))
        }
    }
}

// GET /matches/upcoming — read route. Also the opportunistic trigger: when
// the audit log says a sync is due, a request is emitted onto the work
// queue without ever blocking or failing this response.

#[derive(Deserialize)]
struct UpcomingQuery {
    limit: Option<i64>,
}

async fn upcoming_matches_handler(
    State(state): State<AppState>,
    Query(params): Query<UpcomingQuery>,
) -> Result<Json<ApiResponse<Vec<UpcomingMatchWithPrediction>>>, StatusCode> {
    if sync::is_sync_due(&state.pool, sync::ODDS_FEED).await {
        if state.sync_tx.try_send(SyncRequest { date: None }).is_err() {
            tracing::debug!("Background sync queue full, skipping trigger");
        }
    }

    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    match db::get_upcoming_matches(&state.pool, limit).await {
        Ok(matches) => {
            let mut out = Vec::with_capacity(matches.len());
            for m in matches {
                let prediction = db::get_prediction(&state.pool, &m.id).await.ok().flatten();
                out.push(UpcomingMatchWithPrediction { match_info: m, prediction });
            }
            Ok(Json(ApiResponse::success(out)))
        }
        Err(e) => {
            tracing::error!("Failed to fetch upcoming matches: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
