//! Language model provider implementations

pub mod http_client;
pub mod openai;

pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::OpenAiLlmProvider;

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
