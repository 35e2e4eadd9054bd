//! Knowledge base API handlers

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::ingestion::IngestOptions;
use crate::domain::knowledge::{EntryFilter, SourceContent, SourceType, TenantId};
use crate::infrastructure::services::{GenerateRequest, IngestRequest, QueryRequest};

/// Ingest request body
#[derive(Debug, Deserialize, Validate)]
pub struct IngestBody {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1, max = 255))]
    pub source_id: String,
    pub content: SourceContent,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[validate(range(min = 16, max = 4000))]
    pub chunk_size: Option<usize>,
    #[validate(range(max = 1000))]
    pub chunk_overlap: Option<usize>,
}

/// Batch ingest request body
#[derive(Debug, Deserialize, Validate)]
pub struct IngestBatchBody {
    #[validate(length(min = 1, max = 100))]
    pub items: Vec<IngestItemBody>,
    #[validate(range(min = 16, max = 4000))]
    pub chunk_size: Option<usize>,
    #[validate(range(max = 1000))]
    pub chunk_overlap: Option<usize>,
}

/// One item of a batch ingest
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestItemBody {
    pub title: String,
    pub source_id: String,
    pub content: SourceContent,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Query request body
#[derive(Debug, Deserialize, Validate)]
pub struct QueryBody {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
    #[serde(default)]
    pub source_types: Vec<SourceType>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: Option<f32>,
}

/// Generate request body
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateBody {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
    pub user_id: Option<String>,
    pub intent: Option<String>,
    #[serde(default)]
    pub source_types: Vec<SourceType>,
}

/// Query parameters for entry listing
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub source_type: Option<SourceType>,
    pub source_id: Option<String>,
}

/// Delete response body
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

fn parse_tenant(tenant_id: &str) -> Result<TenantId, ApiError> {
    TenantId::new(tenant_id)
        .map_err(|e| ApiError::bad_request(e.to_string()).with_param("tenant_id"))
}

/// POST /v1/tenants/{tenant_id}/knowledge
pub async fn ingest(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(body): Json<IngestBody>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let tenant = parse_tenant(&tenant_id)?;

    let mut request = IngestRequest::new(body.title, body.source_id, body.content);
    request.metadata = body.metadata;

    let options = IngestOptions {
        chunk_size: body.chunk_size,
        chunk_overlap: body.chunk_overlap,
    };

    let receipt = state.service.ingest(&tenant, request, options).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// POST /v1/tenants/{tenant_id}/knowledge/batch
pub async fn ingest_batch(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(body): Json<IngestBatchBody>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let tenant = parse_tenant(&tenant_id)?;

    let requests: Vec<IngestRequest> = body
        .items
        .into_iter()
        .map(|item| {
            let mut request = IngestRequest::new(item.title, item.source_id, item.content);
            request.metadata = item.metadata;
            request
        })
        .collect();

    let options = IngestOptions {
        chunk_size: body.chunk_size,
        chunk_overlap: body.chunk_overlap,
    };

    let report = state
        .service
        .ingest_batch(&tenant, requests, options)
        .await?;

    Ok((StatusCode::OK, Json(report)))
}

/// POST /v1/tenants/{tenant_id}/query
pub async fn query(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(body): Json<QueryBody>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let tenant = parse_tenant(&tenant_id)?;

    let mut request = QueryRequest::new(body.query).with_source_types(body.source_types);
    request.limit = body.limit;
    request.similarity_threshold = body.similarity_threshold;

    let outcome = state.service.query(&tenant, request).await?;

    Ok((StatusCode::OK, Json(outcome)))
}

/// POST /v1/tenants/{tenant_id}/generate
pub async fn generate(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(body): Json<GenerateBody>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let tenant = parse_tenant(&tenant_id)?;

    let mut request = GenerateRequest::new(body.query).with_source_types(body.source_types);
    request.user_id = body.user_id;
    request.intent = body.intent;

    let result = state.service.generate(&tenant, request).await?;

    Ok((StatusCode::OK, Json(result)))
}

/// GET /v1/tenants/{tenant_id}/knowledge
pub async fn list_entries(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = parse_tenant(&tenant_id)?;

    let mut filter = EntryFilter::new();
    if let Some(source_type) = params.source_type {
        filter = filter.with_source_type(source_type);
    }
    if let Some(source_id) = params.source_id {
        filter = filter.with_source_id(source_id);
    }

    let entries = state.service.list_entries(&tenant, filter).await?;

    Ok((StatusCode::OK, Json(entries)))
}

/// DELETE /v1/tenants/{tenant_id}/knowledge/{entry_id}
pub async fn delete_entry(
    State(state): State<AppState>,
    Path((tenant_id, entry_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = parse_tenant(&tenant_id)?;

    let deleted = state.service.delete(&tenant, entry_id).await?;

    Ok((StatusCode::OK, Json(DeleteResponse { deleted })))
}

/// GET /v1/tenants/{tenant_id}/stats
pub async fn stats(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = parse_tenant(&tenant_id)?;

    let stats = state.service.stats(&tenant).await?;

    Ok((StatusCode::OK, Json(stats)))
}
