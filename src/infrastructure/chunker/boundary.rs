//! Boundary-aware chunking strategy

use unicode_segmentation::UnicodeSegmentation;

use crate::domain::ingestion::chunker::helpers;
use crate::domain::ingestion::{ChunkMetadata, ChunkingConfig, ChunkingStrategy, TextChunk};
use crate::domain::DomainError;

/// Chunking strategy that splits on natural boundaries
///
/// Text is split into paragraphs, then unicode sentences. Sentences are
/// accumulated until `chunk_size` tokens is reached; the trailing
/// `chunk_overlap` tokens of each chunk are carried into the next so context
/// survives the boundary. A single sentence exceeding `chunk_size` is
/// hard-split on word boundaries. Chunks below `min_chunk_size` tokens are
/// dropped as noise.
#[derive(Debug, Clone, Default)]
pub struct BoundaryChunker;

impl BoundaryChunker {
    /// Create a new boundary chunker
    pub fn new() -> Self {
        Self
    }

    fn atomic_units(content: &str) -> Vec<&str> {
        let mut units = Vec::new();

        for paragraph in content.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }

            for sentence in paragraph.unicode_sentences() {
                let sentence = sentence.trim();
                if !sentence.is_empty() {
                    units.push(sentence);
                }
            }
        }

        units
    }

    fn hard_split(unit: &str, chunk_size: usize) -> Vec<String> {
        let words: Vec<&str> = unit.split_whitespace().collect();
        let mut pieces = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + chunk_size).min(words.len());
            pieces.push(words[start..end].join(" "));
            start = end;
        }

        pieces
    }
}

impl ChunkingStrategy for BoundaryChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, DomainError> {
        config.validate()?;

        let content = content.trim();

        if content.is_empty() {
            return Ok(vec![]);
        }

        let mut pieces: Vec<String> = Vec::new();
        for unit in Self::atomic_units(content) {
            if helpers::approximate_tokens(unit) > config.chunk_size {
                pieces.extend(Self::hard_split(unit, config.chunk_size));
            } else {
                pieces.push(unit.to_string());
            }
        }

        let mut raw_chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;

        for piece in pieces {
            let piece_tokens = helpers::approximate_tokens(&piece);

            if current_tokens > 0 && current_tokens + piece_tokens > config.chunk_size {
                raw_chunks.push(current.clone());
                current = helpers::trailing_tokens(&current, config.chunk_overlap);
                current_tokens = helpers::approximate_tokens(&current);
            }

            if current.is_empty() {
                current = piece;
            } else {
                current.push(' ');
                current.push_str(&piece);
            }
            current_tokens = helpers::approximate_tokens(&current);
        }

        if !current.is_empty() {
            raw_chunks.push(current);
        }

        let kept: Vec<String> = raw_chunks
            .into_iter()
            .filter(|chunk| helpers::approximate_tokens(chunk) >= config.min_chunk_size)
            .collect();

        let total = kept.len();
        let mut chunks: Vec<TextChunk> = kept
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let tokens = helpers::approximate_tokens(&chunk);
                TextChunk::new(chunk, ChunkMetadata::new(index, total, tokens))
            })
            .collect();

        // Everything dropped as noise: keep the whole content as one chunk so
        // non-empty input never produces zero chunks.
        if chunks.is_empty() {
            let tokens = helpers::approximate_tokens(content);
            chunks.push(TextChunk::new(content, ChunkMetadata::new(0, 1, tokens)));
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "boundary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_stream(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_empty_content() {
        let chunker = BoundaryChunker::new();
        let config = ChunkingConfig::new(50, 10);

        assert!(chunker.chunk("", &config).unwrap().is_empty());
        assert!(chunker.chunk("  \n\n ", &config).unwrap().is_empty());
    }

    #[test]
    fn test_small_content_single_chunk() {
        let chunker = BoundaryChunker::new();
        let config = ChunkingConfig::new(400, 80).with_min_chunk_size(1);

        let chunks = chunker
            .chunk("Flow Rate: 300 L/min. Max Pressure: 8 bar.", &config)
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.chunk_index, 0);
        assert_eq!(chunks[0].metadata.total_chunks, 1);
    }

    #[test]
    fn test_sentences_accumulate_until_size() {
        let chunker = BoundaryChunker::new();
        let config = ChunkingConfig::new(12, 3).with_min_chunk_size(1);

        let content = "One two three four five. Six seven eight nine ten. \
                       Eleven twelve thirteen fourteen fifteen. Sixteen seventeen eighteen nineteen twenty.";
        let chunks = chunker.chunk(content, &config).unwrap();

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            // accumulated sentences never exceed size by more than the carry
            assert!(chunk.token_count() <= config.chunk_size + config.chunk_overlap);
        }
    }

    #[test]
    fn test_overlap_carried_between_chunks() {
        let chunker = BoundaryChunker::new();
        let config = ChunkingConfig::new(10, 4).with_min_chunk_size(1);

        let content = "Alpha beta gamma delta epsilon zeta. Eta theta iota kappa lambda mu. \
                       Nu xi omicron pi rho sigma.";
        let chunks = chunker.chunk(content, &config).unwrap();

        assert!(chunks.len() >= 2);

        for window in chunks.windows(2) {
            let prev_words = word_stream(&window[0].content);
            let next_words = word_stream(&window[1].content);
            let carried = config.chunk_overlap.min(prev_words.len());

            assert_eq!(
                prev_words[prev_words.len() - carried..],
                next_words[..carried]
            );
        }
    }

    #[test]
    fn test_coverage_reconstructs_text() {
        let chunker = BoundaryChunker::new();

        for (size, overlap) in [(10, 2), (15, 5), (30, 8)] {
            let config = ChunkingConfig::new(size, overlap).with_min_chunk_size(1);
            let content = "The quick brown fox jumps over the lazy dog near the riverbank. \
                           A second sentence keeps the narrative moving along nicely. \
                           Industrial pumps require regular maintenance and careful monitoring. \
                           Flow rates vary with pressure and viscosity across operating ranges.\n\n\
                           A new paragraph introduces storage requirements for spare parts. \
                           Each warehouse keeps replacement seals impellers and couplings on hand.";

            let chunks = chunker.chunk(content, &config).unwrap();

            let mut rebuilt: Vec<String> = Vec::new();
            for (i, chunk) in chunks.iter().enumerate() {
                let words = word_stream(&chunk.content);
                if i == 0 {
                    rebuilt.extend(words);
                } else {
                    let prev_words = word_stream(&chunks[i - 1].content);
                    let carried = config.chunk_overlap.min(prev_words.len());
                    rebuilt.extend(words.into_iter().skip(carried));
                }
            }

            assert_eq!(
                rebuilt,
                word_stream(content),
                "coverage failed for size={} overlap={}",
                size,
                overlap
            );
        }
    }

    #[test]
    fn test_determinism() {
        let chunker = BoundaryChunker::new();
        let config = ChunkingConfig::new(12, 3).with_min_chunk_size(1);
        let content = "Determinism matters for idempotent re-ingestion. The same text must \
                       always chunk identically. Byte for byte. Every single time.";

        let first = chunker.chunk(content, &config).unwrap();
        let second = chunker.chunk(content, &config).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_oversized_sentence_hard_split() {
        let chunker = BoundaryChunker::new();
        let config = ChunkingConfig::new(5, 0).with_min_chunk_size(1);

        let content = "one two three four five six seven eight nine ten eleven twelve";
        let chunks = chunker.chunk(content, &config).unwrap();

        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.token_count() <= 5);
        }
    }

    #[test]
    fn test_noise_chunks_dropped() {
        let chunker = BoundaryChunker::new();
        let config = ChunkingConfig::new(15, 0).with_min_chunk_size(4);

        // A 14-word paragraph followed by a 2-word fragment that cannot fit
        // into the first chunk and is too short to stand alone
        let content = "First paragraph with plenty of words to stand on its very own merits here.\n\n\
                       Ok thanks.";
        let chunks = chunker.chunk(content, &config).unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].content.contains("Ok thanks."));
        assert!(chunks.iter().all(|c| c.token_count() >= 4));
    }

    #[test]
    fn test_tiny_content_keeps_one_chunk() {
        let chunker = BoundaryChunker::new();
        let config = ChunkingConfig::new(50, 10).with_min_chunk_size(8);

        let chunks = chunker.chunk("Just three words", &config).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Just three words");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let chunker = BoundaryChunker::new();
        assert!(chunker
            .chunk("content", &ChunkingConfig::new(0, 0))
            .is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(BoundaryChunker::new().name(), "boundary");
    }
}
