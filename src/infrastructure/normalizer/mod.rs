//! Source content normalization
//!
//! Converts raw source payloads into canonical plain text plus metadata.
//! Pure transformation: no network calls, no storage access.

pub mod html;
pub mod markdown;
pub mod structured;
pub mod text;

use crate::domain::error::DomainError;
use crate::domain::ingestion::NormalizedDocument;
use crate::domain::knowledge::{SourceContent, TextFormat};

/// Normalizer configuration
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Maximum normalized text length in characters; longer input is
    /// truncated at a character boundary to bound embedding cost
    pub max_content_length: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_content_length: 200_000,
        }
    }
}

/// Normalizes raw source payloads into canonical plain text
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Normalize a source payload
    ///
    /// Fails with a validation error when the payload yields no text after
    /// markup stripping.
    pub fn normalize(&self, content: &SourceContent) -> Result<NormalizedDocument, DomainError> {
        let (raw_text, format_label) = match content {
            SourceContent::Document { body, format } | SourceContent::Manual { body, format } => {
                let text = match format {
                    TextFormat::Plain => body.clone(),
                    TextFormat::Markdown => markdown::markdown_to_text(body),
                    TextFormat::Html => html::html_to_text(body),
                };
                (text, format_label_for(*format))
            }
            SourceContent::Product {
                name,
                description,
                attributes,
            } => (
                structured::product_to_text(name, description, attributes),
                "structured",
            ),
            SourceContent::ErpRecord { entity, fields } => (
                structured::erp_record_to_text(entity, fields),
                "structured",
            ),
            SourceContent::EmailArchive {
                subject,
                from,
                body,
            } => (structured::email_to_text(subject, from, body), "plain"),
        };

        let cleaned = text::clean_plain_text(&raw_text);

        if cleaned.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "{} content is empty after normalization",
                content.source_type()
            )));
        }

        let (capped, truncated) = self.cap_length(cleaned);

        let mut document = NormalizedDocument::new(capped)
            .with_metadata("format", serde_json::json!(format_label));

        if truncated {
            document = document.with_metadata("truncated", serde_json::json!(true));
        }

        Ok(document)
    }

    fn cap_length(&self, text: String) -> (String, bool) {
        if text.len() <= self.config.max_content_length {
            return (text, false);
        }

        let mut cut = self.config.max_content_length;
        while cut > 0 && !text.is_char_boundary(cut) {
            cut -= 1;
        }

        (text[..cut].trim_end().to_string(), true)
    }
}

fn format_label_for(format: TextFormat) -> &'static str {
    match format {
        TextFormat::Plain => "plain",
        TextFormat::Markdown => "markdown",
        TextFormat::Html => "html",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn normalizer() -> Normalizer {
        Normalizer::new(NormalizerConfig::default())
    }

    #[test]
    fn test_plain_document() {
        let content = SourceContent::document("Flow Rate:   300 L/min");
        let document = normalizer().normalize(&content).unwrap();

        assert_eq!(document.text, "Flow Rate: 300 L/min");
        assert_eq!(
            document.metadata.get("format"),
            Some(&serde_json::json!("plain"))
        );
    }

    #[test]
    fn test_markdown_document() {
        let content = SourceContent::Document {
            body: "# Pump P-300\n\nFlow Rate: **300 L/min**".to_string(),
            format: TextFormat::Markdown,
        };
        let document = normalizer().normalize(&content).unwrap();

        assert!(document.text.contains("Pump P-300"));
        assert!(document.text.contains("Flow Rate: 300 L/min"));
        assert!(!document.text.contains('#'));
    }

    #[test]
    fn test_html_document() {
        let content = SourceContent::Document {
            body: "<body><script>x()</script><p>Max Pressure: 8 bar</p></body>".to_string(),
            format: TextFormat::Html,
        };
        let document = normalizer().normalize(&content).unwrap();

        assert_eq!(document.text, "Max Pressure: 8 bar");
    }

    #[test]
    fn test_empty_content_rejected() {
        let content = SourceContent::document("   \n\t  ");
        let result = normalizer().normalize(&content);

        assert!(matches!(
            result,
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn test_empty_html_rejected() {
        let content = SourceContent::Document {
            body: "<body><script>only_code()</script></body>".to_string(),
            format: TextFormat::Html,
        };

        assert!(normalizer().normalize(&content).is_err());
    }

    #[test]
    fn test_truncation_marks_metadata() {
        let normalizer = Normalizer::new(NormalizerConfig {
            max_content_length: 20,
        });
        let content = SourceContent::document("word ".repeat(50));
        let document = normalizer.normalize(&content).unwrap();

        assert!(document.text.len() <= 20);
        assert_eq!(
            document.metadata.get("truncated"),
            Some(&serde_json::json!(true))
        );
    }

    #[test]
    fn test_product_normalization() {
        let mut attributes = HashMap::new();
        attributes.insert("flow_rate".to_string(), "300 L/min".to_string());

        let content = SourceContent::Product {
            name: "Pump P-300".to_string(),
            description: "Industrial pump".to_string(),
            attributes,
        };
        let document = normalizer().normalize(&content).unwrap();

        assert!(document.text.contains("Product: Pump P-300"));
        assert!(document.text.contains("flow_rate: 300 L/min"));
    }
}
