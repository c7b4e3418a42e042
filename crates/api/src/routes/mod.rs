pub mod health;
pub mod records;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /records/{id}                 GET latest, POST upsert
/// ```
pub fn api_v1_routes() -> Router<AppState> {
    Router::new().nest("/records", records::v1_router())
}

/// Build the `/api/v2` route tree.
///
/// ```text
/// /records/{id}                 GET latest or ?version=N, POST upsert
/// /records/{id}/versions        GET version numbers
/// ```
pub fn api_v2_routes() -> Router<AppState> {
    Router::new().nest("/records", records::v2_router())
}
