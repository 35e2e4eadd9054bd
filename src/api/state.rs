//! Application state shared across API handlers

use std::sync::Arc;

use crate::infrastructure::services::KnowledgeService;

/// Shared state for the HTTP API
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<KnowledgeService>,
}

impl AppState {
    pub fn new(service: Arc<KnowledgeService>) -> Self {
        Self { service }
    }
}
