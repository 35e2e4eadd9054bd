//! Language model provider trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::request::LlmRequest;
use super::response::LlmResponse;
use crate::domain::error::DomainError;

/// Trait for language model providers
///
/// Implementations classify failures the same way embedding providers do:
/// timeouts and rate limits are `TransientProvider`, credential failures are
/// `PermanentProvider` and must never be retried.
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send a chat completion request
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Default chat model for this provider
    fn default_model(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::generation::message::Message;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock language model provider for testing
    ///
    /// Queued errors are returned once each, in order, before the configured
    /// response is served; this drives the generator's retry paths.
    #[derive(Debug)]
    pub struct MockLlmProvider {
        response: Mutex<Option<LlmResponse>>,
        queued_errors: Mutex<Vec<DomainError>>,
        call_count: AtomicUsize,
    }

    impl MockLlmProvider {
        pub fn new() -> Self {
            Self {
                response: Mutex::new(None),
                queued_errors: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn with_answer(self, answer: impl Into<String>) -> Self {
            let response = LlmResponse::new(
                "mock-response".to_string(),
                "mock-model".to_string(),
                Message::assistant(answer),
            );
            *self.response.lock().unwrap() = Some(response);
            self
        }

        pub fn with_queued_error(self, error: DomainError) -> Self {
            self.queued_errors.lock().unwrap().push(error);
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    impl Default for MockLlmProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn chat(
            &self,
            _model: &str,
            _request: LlmRequest,
        ) -> Result<LlmResponse, DomainError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            {
                let mut errors = self.queued_errors.lock().unwrap();
                if !errors.is_empty() {
                    return Err(errors.remove(0));
                }
            }

            self.response
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| DomainError::internal("no mock response configured"))
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }

        fn default_model(&self) -> &'static str {
            "mock-model"
        }
    }
}
