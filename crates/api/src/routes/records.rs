//! Route definitions for versioned records.

use axum::routing::get;
use axum::Router;

use crate::handlers::records;
use crate::state::AppState;

/// Version 1 record routes, registered as `/api/v1/records`.
///
/// ```text
/// GET    /{id}              get_record
/// POST   /{id}              upsert_record
/// ```
pub fn v1_router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(records::get_record).post(records::upsert_record),
    )
}

/// Version 2 record routes, registered as `/api/v2/records`.
///
/// ```text
/// GET    /{id}              get_record_at_version
/// POST   /{id}              upsert_record
/// GET    /{id}/versions     list_versions
/// ```
pub fn v2_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(records::get_record_at_version).post(records::upsert_record),
        )
        .route("/{id}/versions", get(records::list_versions))
}
