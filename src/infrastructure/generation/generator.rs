//! Grounded answer generation
//!
//! Builds a prompt from the highest-similarity chunks within a token budget,
//! invokes the language model provider with a timeout, and attaches the
//! chunks actually used as citations. A transient failure is retried exactly
//! once; if it fails again the result degrades to a summary of the raw
//! excerpts. The generator never fabricates an answer without retrieved
//! grounding, and authentication failures propagate uncaught.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::generation::{Citation, GenerationResult, LlmProvider, LlmRequest};
use crate::domain::ingestion::chunker::helpers::approximate_tokens;
use crate::domain::knowledge::RetrievalResult;
use crate::domain::DomainError;

const NO_GROUNDING_ANSWER: &str =
    "No relevant knowledge base content was found for this query.";

/// Phrases that signal model uncertainty and reduce confidence
const UNCERTAINTY_MARKERS: &[&str] = &[
    "i don't know",
    "i do not know",
    "not sure",
    "cannot determine",
    "no information",
    "unable to answer",
];

/// Generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Chat model to invoke
    pub model: String,
    /// Token budget for retrieved context in the prompt
    pub context_token_budget: usize,
    /// Maximum tokens for the generated answer
    pub max_answer_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Maximum characters per citation excerpt
    pub excerpt_length: usize,
}

impl GeneratorConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            context_token_budget: 2_000,
            max_answer_tokens: 512,
            temperature: 0.2,
            request_timeout: Duration::from_secs(30),
            excerpt_length: 160,
        }
    }

    pub fn with_context_token_budget(mut self, budget: usize) -> Self {
        self.context_token_budget = budget.max(1);
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// Composes grounded, citation-backed answers
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    config: GeneratorConfig,
}

impl std::fmt::Debug for AnswerGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerGenerator")
            .field("provider", &self.llm.provider_name())
            .field("config", &self.config)
            .finish()
    }
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: GeneratorConfig) -> Self {
        Self { llm, config }
    }

    /// Generate an answer for the query from the retrieved chunks
    pub async fn generate(
        &self,
        query: &str,
        retrieved: &[RetrievalResult],
    ) -> Result<GenerationResult, DomainError> {
        let started = Instant::now();

        if retrieved.is_empty() {
            return Ok(GenerationResult::degraded(NO_GROUNDING_ANSWER, vec![])
                .with_processing_time(started.elapsed().as_millis() as u64));
        }

        let used = self.select_within_budget(retrieved);
        let request = self.build_request(query, &used);

        match self.chat_with_retry(request).await {
            Ok(answer) => {
                let confidence = self.derive_confidence(&answer, &used);
                let citations = self.citations_for(&used);

                Ok(GenerationResult::grounded(answer, confidence, citations)
                    .with_processing_time(started.elapsed().as_millis() as u64))
            }
            Err(error) if error.is_transient() => {
                warn!(error = %error, "Generation failed after retry, degrading to excerpts");

                let citations = self.citations_for(&used);
                Ok(
                    GenerationResult::degraded(self.excerpt_summary(&used), citations)
                        .with_processing_time(started.elapsed().as_millis() as u64),
                )
            }
            Err(error) => Err(error),
        }
    }

    /// Highest-similarity chunks first, until the context budget is spent;
    /// the top chunk is always included
    fn select_within_budget<'a>(
        &self,
        retrieved: &'a [RetrievalResult],
    ) -> Vec<&'a RetrievalResult> {
        let mut ranked: Vec<&RetrievalResult> = retrieved.iter().collect();
        ranked.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut used = Vec::new();
        let mut spent = 0usize;

        for result in ranked {
            let cost = approximate_tokens(&result.content);
            if !used.is_empty() && spent + cost > self.config.context_token_budget {
                continue;
            }
            spent += cost;
            used.push(result);
        }

        debug!(
            used = used.len(),
            retrieved = retrieved.len(),
            context_tokens = spent,
            "Selected context chunks"
        );

        used
    }

    fn build_request(&self, query: &str, used: &[&RetrievalResult]) -> LlmRequest {
        let mut context = String::new();

        for (i, result) in used.iter().enumerate() {
            context.push_str(&format!("[{}] {}\n{}\n\n", i + 1, result.title, result.content));
        }

        let user_message = format!(
            "Context:\n{}Question: {}\n\nAnswer the question using only the context above. \
             Reference the context blocks you used as [n].",
            context, query
        );

        LlmRequest::builder()
            .system(
                "You answer questions strictly from the provided context. \
                 If the context does not contain the answer, say that no \
                 information is available.",
            )
            .user(user_message)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_answer_tokens)
            .build()
    }

    /// One attempt plus exactly one retry on transient failure
    async fn chat_with_retry(&self, request: LlmRequest) -> Result<String, DomainError> {
        match self.chat_once(request.clone()).await {
            Ok(answer) => Ok(answer),
            Err(error) if error.is_transient() => {
                warn!(error = %error, "Transient generation failure, retrying once");
                self.chat_once(request).await
            }
            Err(error) => Err(error),
        }
    }

    async fn chat_once(&self, request: LlmRequest) -> Result<String, DomainError> {
        let response = match timeout(
            self.config.request_timeout,
            self.llm.chat(&self.config.model, request),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(DomainError::transient(
                    self.llm.provider_name(),
                    format!(
                        "chat request timed out after {}ms",
                        self.config.request_timeout.as_millis()
                    ),
                ));
            }
        };

        Ok(response.content().to_string())
    }

    /// Mean similarity of cited chunks, reduced when the model signals
    /// uncertainty
    fn derive_confidence(&self, answer: &str, used: &[&RetrievalResult]) -> f32 {
        if used.is_empty() {
            return 0.0;
        }

        let mean: f32 =
            used.iter().map(|r| r.similarity).sum::<f32>() / used.len() as f32;

        let lowered = answer.to_lowercase();
        let uncertain = UNCERTAINTY_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker));

        let confidence = if uncertain { mean * 0.5 } else { mean };
        confidence.clamp(0.0, 1.0)
    }

    fn citations_for(&self, used: &[&RetrievalResult]) -> Vec<Citation> {
        used.iter()
            .map(|result| {
                Citation::new(
                    result.chunk_id,
                    truncate_excerpt(&result.content, self.config.excerpt_length),
                    result.title.clone(),
                )
            })
            .collect()
    }

    fn excerpt_summary(&self, used: &[&RetrievalResult]) -> String {
        let mut summary = String::from(
            "The answer service is currently unavailable. \
             Relevant knowledge base excerpts:\n",
        );

        for result in used {
            summary.push_str(&format!(
                "- ({}) {}\n",
                result.title,
                truncate_excerpt(&result.content, self.config.excerpt_length)
            ));
        }

        summary
    }
}

fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::MockLlmProvider;
    use crate::domain::knowledge::SourceType;
    use uuid::Uuid;

    fn fast_config() -> GeneratorConfig {
        GeneratorConfig::new("mock-model").with_request_timeout(Duration::from_secs(5))
    }

    fn retrieved(content: &str, similarity: f32, title: &str) -> RetrievalResult {
        RetrievalResult::new(Uuid::new_v4(), Uuid::new_v4(), content, similarity)
            .with_provenance(title, SourceType::Manual)
    }

    #[tokio::test]
    async fn test_grounded_answer_with_citations() {
        let llm = Arc::new(MockLlmProvider::new().with_answer("The flow rate is 300 L/min [1]."));
        let generator = AnswerGenerator::new(llm, fast_config());

        let chunks = vec![
            retrieved("Flow Rate: 300 L/min", 0.9, "Pump P-300 Manual"),
            retrieved("Max Pressure: 8 bar", 0.7, "Pump P-300 Manual"),
        ];
        let result = generator.generate("pump flow rate", &chunks).await.unwrap();

        assert!(!result.degraded);
        assert!(result.answer.contains("300"));
        assert_eq!(result.citations.len(), 2);
        assert_eq!(result.sources, vec!["Pump P-300 Manual".to_string()]);
        assert!((result.confidence - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_zero_chunks_returns_degraded_not_error() {
        let llm = Arc::new(MockLlmProvider::new().with_answer("should not be called"));
        let generator = AnswerGenerator::new(llm.clone(), fast_config());

        let result = generator.generate("anything", &[]).await.unwrap();

        assert!(result.degraded);
        assert!(result.citations.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once_then_succeeds() {
        let llm = Arc::new(
            MockLlmProvider::new()
                .with_answer("300 L/min")
                .with_queued_error(DomainError::transient("mock", "timeout")),
        );
        let generator = AnswerGenerator::new(llm.clone(), fast_config());

        let chunks = vec![retrieved("Flow Rate: 300 L/min", 0.9, "Pump P-300 Manual")];
        let result = generator.generate("flow rate", &chunks).await.unwrap();

        assert!(!result.degraded);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retry_degrades_with_excerpts() {
        let llm = Arc::new(
            MockLlmProvider::new()
                .with_answer("unreachable")
                .with_queued_error(DomainError::transient("mock", "timeout"))
                .with_queued_error(DomainError::transient("mock", "timeout")),
        );
        let generator = AnswerGenerator::new(llm.clone(), fast_config());

        let chunks = vec![retrieved("Flow Rate: 300 L/min", 0.9, "Pump P-300 Manual")];
        let result = generator.generate("flow rate", &chunks).await.unwrap();

        assert!(result.degraded);
        assert!(result.answer.contains("Flow Rate: 300 L/min"));
        assert!(result.answer.contains("Pump P-300 Manual"));
        assert_eq!(result.citations.len(), 1);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_propagates() {
        let llm = Arc::new(
            MockLlmProvider::new()
                .with_answer("unreachable")
                .with_queued_error(DomainError::permanent("mock", "invalid credentials")),
        );
        let generator = AnswerGenerator::new(llm.clone(), fast_config());

        let chunks = vec![retrieved("Flow Rate: 300 L/min", 0.9, "Pump P-300 Manual")];
        let result = generator.generate("flow rate", &chunks).await;

        assert!(matches!(
            result,
            Err(DomainError::PermanentProvider { .. })
        ));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_token_budget_drops_lowest_similarity() {
        let llm = Arc::new(MockLlmProvider::new().with_answer("answer"));
        let generator = AnswerGenerator::new(
            llm,
            fast_config().with_context_token_budget(6),
        );

        let chunks = vec![
            retrieved("one two three four five", 0.9, "Top"),
            retrieved("six seven eight nine ten", 0.5, "Dropped"),
        ];
        let result = generator.generate("query", &chunks).await.unwrap();

        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].title, "Top");
    }

    #[tokio::test]
    async fn test_uncertainty_reduces_confidence() {
        let llm = Arc::new(
            MockLlmProvider::new().with_answer("I don't know based on the context."),
        );
        let generator = AnswerGenerator::new(llm, fast_config());

        let chunks = vec![retrieved("content", 0.8, "Doc")];
        let result = generator.generate("query", &chunks).await.unwrap();

        assert!((result.confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_truncate_excerpt() {
        assert_eq!(truncate_excerpt("short", 10), "short");

        let long = "a".repeat(20);
        let excerpt = truncate_excerpt(&long, 10);
        assert!(excerpt.starts_with("aaaaaaaaaa"));
        assert!(excerpt.ends_with('…'));
    }
}
