//! Application configuration

pub mod app_config;

pub use app_config::{
    AppConfig, EmbeddingSettings, GenerationSettings, IngestionSettings, LogFormat, LoggingConfig,
    ServerConfig, StorageConfig,
};
