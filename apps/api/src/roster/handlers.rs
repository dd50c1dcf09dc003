//! Axum route handlers for team assignment and roster tables.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::roster::codec::ParsedRoster;
use crate::roster::{parse_table, to_table, Participant, RosterBalancer, Team, TeamSummary};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub participants: Vec<Participant>,
    pub max_players_per_team: Option<i64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AssignResponse {
    pub teams: Vec<Team>,
    pub summaries: Vec<TeamSummary>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTableQuery {
    pub max_players_per_team: Option<i64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub teams: Vec<Team>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/teams/assign
///
/// Balances a JSON roster into teams. Returns the teams plus per-team summaries.
pub async fn handle_assign(
    State(state): State<AppState>,
    Json(mut request): Json<AssignRequest>,
) -> Result<Json<AssignResponse>, AppError> {
    // Names are stored trimmed so exported tables read back the same roster.
    for p in &mut request.participants {
        p.name = p.name.trim().to_string();
    }
    if let Some(p) = request.participants.iter().find(|p| p.level == 0) {
        return Err(AppError::Validation(format!(
            "Participant '{}' has level 0; levels must be positive",
            p.name
        )));
    }

    let teams = run_balancer(
        &state,
        request.participants,
        request.max_players_per_team,
        request.seed,
    )
    .await?;
    let summaries = teams.iter().map(TeamSummary::from).collect();

    Ok(Json(AssignResponse {
        teams,
        summaries,
        generated_at: Utc::now(),
    }))
}

/// POST /api/v1/teams/assign/csv
///
/// Table in, balanced table out. Unreadable rows are skipped.
pub async fn handle_assign_csv(
    State(state): State<AppState>,
    Query(query): Query<AssignTableQuery>,
    body: String,
) -> Result<Response, AppError> {
    let parsed = parse_table(&body);
    if !parsed.skipped_rows.is_empty() {
        tracing::debug!(skipped = ?parsed.skipped_rows, "Skipped unreadable roster rows");
    }

    let teams = run_balancer(
        &state,
        parsed.participants,
        query.max_players_per_team,
        query.seed,
    )
    .await?;

    Ok(table_response(to_table(&teams)?))
}

/// POST /api/v1/roster/import
///
/// Parses a roster table and reports which rows were skipped.
pub async fn handle_import(body: String) -> Json<ParsedRoster> {
    Json(parse_table(&body))
}

/// POST /api/v1/roster/export
pub async fn handle_export(Json(request): Json<ExportRequest>) -> Result<Response, AppError> {
    Ok(table_response(to_table(&request.teams)?))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Runs the balancer off the async scheduler. The request seed wins over the
/// configured one; without either, the generator is seeded from entropy.
async fn run_balancer(
    state: &AppState,
    participants: Vec<Participant>,
    max_players_per_team: Option<i64>,
    seed: Option<u64>,
) -> Result<Vec<Team>, AppError> {
    let cap = max_players_per_team.unwrap_or(state.config.default_max_players_per_team);
    let seed = seed.or(state.config.shuffle_seed);

    let result = tokio::task::spawn_blocking(move || match seed {
        Some(seed) => RosterBalancer::seeded(seed).assign_teams(participants, cap),
        None => RosterBalancer::from_entropy().assign_teams(participants, cap),
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?;

    Ok(result?)
}

fn table_response(table: String) -> Response {
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], table).into_response()
}
