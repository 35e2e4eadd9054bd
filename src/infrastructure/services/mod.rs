//! Service layer

pub mod knowledge_service;

pub use knowledge_service::{
    GenerateRequest, IngestRequest, KnowledgeService, QueryRequest, ServiceDefaults,
};
