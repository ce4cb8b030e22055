//! Handlers for the transaction verification endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::actor::Actor;
use super::error::{AppError, AppResult};
use super::state::AppState;
use crate::core::{BulkSummary, RepairReport, ReconciliationResult};
use crate::types::{DocPath, ResolveAction, Transaction};

// ---------------------------------------------------------------------------
// Request / response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

/// Body of `PATCH /transactions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub doc_path: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub success: bool,
    pub action: ResolveAction,
    pub points: i64,
}

/// Body of `POST /transactions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveManyRequest {
    pub doc_paths: Option<Vec<DocPath>>,
    pub action: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileParams {
    #[serde(default)]
    pub apply: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_action(action: Option<&str>) -> AppResult<Option<ResolveAction>> {
    match action.map(str::trim).filter(|a| !a.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<ResolveAction>()
            .map(Some)
            .map_err(|_| AppError::BadRequest("action must be 'verify' or 'reject'".into())),
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    _actor: Actor,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Transaction>>> {
    let transactions = state.engine.list_recent(params.limit).await?;
    Ok(Json(transactions))
}

/// PATCH /transactions
pub async fn resolve_transaction(
    State(state): State<AppState>,
    actor: Actor,
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> AppResult<Json<ResolveResponse>> {
    let request = json_body(body)?;
    let doc_path = request
        .doc_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("docPath is required".into()))?;
    let action = parse_action(request.action.as_deref())?
        .ok_or_else(|| AppError::BadRequest("action is required".into()))?;

    let outcome = state.engine.resolve(&doc_path, action, &actor.id).await?;

    Ok(Json(ResolveResponse {
        success: true,
        action: outcome.action,
        points: outcome.points,
    }))
}

/// POST /transactions
pub async fn resolve_many(
    State(state): State<AppState>,
    actor: Actor,
    body: Result<Json<ResolveManyRequest>, JsonRejection>,
) -> AppResult<Json<BulkSummary>> {
    let request = json_body(body)?;
    let doc_paths = request
        .doc_paths
        .filter(|paths| !paths.is_empty())
        .ok_or_else(|| AppError::BadRequest("docPaths must be a non-empty list".into()))?;
    let action = parse_action(request.action.as_deref())?;

    let summary = state
        .engine
        .resolve_many(&doc_paths, action, &actor.id)
        .await?;
    Ok(Json(summary))
}

/// POST /transactions/reconcile
///
/// Body is the raw CSV export.
pub async fn reconcile(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<ReconcileParams>,
    body: String,
) -> AppResult<Json<ReconciliationResult>> {
    let result = state
        .engine
        .reconcile(&body, &actor.id, params.apply)
        .await?;
    Ok(Json(result))
}

/// POST /transactions/repair
pub async fn repair(State(state): State<AppState>, actor: Actor) -> AppResult<Json<RepairReport>> {
    let report = state.engine.repair(&actor.id).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!(parse_action(None).unwrap(), None);
        assert_eq!(parse_action(Some("")).unwrap(), None);
        assert_eq!(parse_action(Some("Reject")).unwrap(), Some(ResolveAction::Reject));
        assert!(matches!(parse_action(Some("approve")), Err(AppError::BadRequest(_))));
    }
}
