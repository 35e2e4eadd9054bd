//! Infrastructure layer: provider implementations, storage and services

pub mod chunker;
pub mod embedding;
pub mod generation;
pub mod llm;
pub mod logging;
pub mod normalizer;
pub mod retrieval;
pub mod services;
pub mod store;
