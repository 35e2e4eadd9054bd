use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub ingestion: IngestionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Knowledge store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// "in_memory" or "postgres" (connects via DATABASE_URL)
    pub backend: String,
    /// "native_index" (pgvector) or "linear_scan"
    pub search_strategy: String,
    /// Fixed embedding dimension for this deployment
    pub embedding_dimension: usize,
    /// Candidate cap for linear-scan search
    pub linear_scan_limit: usize,
    /// Create tables on startup (dev/test only; production migrations are
    /// managed outside this service)
    pub ensure_schema: bool,
}

/// Embedding provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    pub model: String,
    /// Environment variable holding the provider API key
    pub api_key_env: String,
    /// Optional OpenAI-compatible base URL override
    pub base_url: Option<String>,
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Language model settings for answer generation
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSettings {
    pub model: String,
    /// Environment variable holding the provider API key
    pub api_key_env: String,
    /// Optional OpenAI-compatible base URL override
    pub base_url: Option<String>,
    pub context_token_budget: usize,
    pub max_answer_tokens: u32,
    pub timeout_secs: u64,
}

/// Ingestion and retrieval defaults
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
    pub max_content_length: usize,
    pub query_limit: usize,
    pub similarity_threshold: f32,
    pub per_type_cap: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "in_memory".to_string(),
            search_strategy: "linear_scan".to_string(),
            embedding_dimension: 1536,
            linear_scan_limit: 10_000,
            ensure_schema: false,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            batch_size: 64,
            max_concurrency: 4,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            context_token_budget: 2_000,
            max_answer_tokens: 512,
            timeout_secs: 30,
        }
    }
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            chunk_overlap: 80,
            min_chunk_size: 8,
            max_content_length: 200_000,
            query_limit: 10,
            similarity_threshold: 0.5,
            per_type_cap: Some(5),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
