//! Handlers for versioned records.
//!
//! Path and query values arrive as raw strings and are validated here so a
//! malformed id yields the same JSON error shape as every other failure.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use timetravel_core::record::FieldChanges;
use timetravel_core::types::{RecordId, VersionNumber};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
Query param types
-------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
pub struct VersionParams {
    pub version: Option<String>,
}

/* --------------------------------------------------------------------------
Helpers
-------------------------------------------------------------------------- */

/// Parse a path or query value that must be a positive integer.
fn parse_positive(raw: &str, what: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::BadRequest(format!(
            "invalid {what}; {what} must be a positive number"
        ))),
    }
}

fn parse_id(raw: &str) -> AppResult<RecordId> {
    parse_positive(raw, "id")
}

fn parse_version(raw: &str) -> AppResult<VersionNumber> {
    parse_positive(raw, "version")
}

/* --------------------------------------------------------------------------
Handlers
-------------------------------------------------------------------------- */

/// GET /api/v1/records/{id}
///
/// Fetch the latest version of a record.
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let record = state.records.get_record(&state.op_context(), id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// GET /api/v2/records/{id}?version={version}
///
/// Fetch the latest version, or a specific one when `version` is given.
pub async fn get_record_at_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<VersionParams>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let ctx = state.op_context();

    let record = match params.version.as_deref() {
        None | Some("") => state.records.get_record(&ctx, id).await?,
        Some(raw) => {
            let version = parse_version(raw)?;
            state.records.get_record_version(&ctx, id, version).await?
        }
    };

    Ok(Json(DataResponse { data: record }))
}

/// POST /api/v1/records/{id}, POST /api/v2/records/{id}
///
/// Body is a JSON object of field changes; a `null` value deletes the field.
/// Creates the record (201) if the id is unknown, otherwise appends a new
/// version (200).
pub async fn upsert_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<FieldChanges>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let outcome = state
        .records
        .upsert_record(&state.op_context(), id, &changes)
        .await?;

    let created = outcome.is_created();
    let record = outcome.into_record();

    tracing::info!(
        record_id = record.id,
        version = record.version,
        created,
        fields = changes.len(),
        "Record written"
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DataResponse { data: record })))
}

/// GET /api/v2/records/{id}/versions
///
/// List every version number of a record, ascending.
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let versions = state.records.list_versions(&state.op_context(), id).await?;
    Ok(Json(DataResponse { data: versions }))
}
