//! Embedding provider implementations and the embedding gateway

pub mod gateway;
pub mod openai;

pub use crate::infrastructure::llm::HttpClientTrait;
pub use gateway::{EmbeddingGateway, GatewayConfig};
pub use openai::OpenAiEmbeddingProvider;
