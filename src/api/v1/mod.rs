//! v1 API routes

pub mod knowledge;

use axum::routing::{delete, get, post};
use axum::Router;

use super::state::AppState;

/// Create the v1 router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants/{tenant_id}/knowledge",
            post(knowledge::ingest).get(knowledge::list_entries),
        )
        .route(
            "/tenants/{tenant_id}/knowledge/batch",
            post(knowledge::ingest_batch),
        )
        .route(
            "/tenants/{tenant_id}/knowledge/{entry_id}",
            delete(knowledge::delete_entry),
        )
        .route("/tenants/{tenant_id}/query", post(knowledge::query))
        .route("/tenants/{tenant_id}/generate", post(knowledge::generate))
        .route("/tenants/{tenant_id}/stats", get(knowledge::stats))
}
