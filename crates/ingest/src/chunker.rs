use regex::Regex;
use std::sync::LazyLock;

use crate::chunk::Chunk;

/// Slide delimiter written by the upstream slide-text extractor.
static SLIDE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=== SLIDE \d+ ===").expect("slide marker pattern is valid"));

const SLIDE_SEPARATOR: &str = "\n";
const PARAGRAPH_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Soft ceiling on chunk length, in characters
    pub max_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 4000,
        }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn with_max_size(max_chunk_size: usize) -> Self {
        Self::new(ChunkerConfig { max_chunk_size })
    }

    /// Split text into chunks of at most `max_chunk_size` characters.
    ///
    /// Slides are packed together first. Any chunk that is still too large
    /// (a single long slide, or text without slide markers) is re-packed from
    /// its paragraphs. A paragraph longer than the limit is emitted whole.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let slide_chunks = self.pack(SLIDE_MARKER.split(text), SLIDE_SEPARATOR);

        let mut chunks = Vec::with_capacity(slide_chunks.len());
        for chunk in slide_chunks {
            if chunk.chars().count() <= self.config.max_chunk_size {
                chunks.push(chunk);
            } else {
                chunks.extend(self.pack(chunk.split(PARAGRAPH_SEPARATOR), PARAGRAPH_SEPARATOR));
            }
        }

        chunks
    }

    /// Chunk a document and number the pieces from 1.
    pub fn chunk_document(&self, source: &str, text: &str) -> Vec<Chunk> {
        self.chunk(text)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| Chunk::new(source, i + 1, chunk))
            .collect()
    }

    /// Greedy accumulation: keep appending units while the joined length
    /// stays within the limit, otherwise close the buffer and seed a new one.
    fn pack<'a>(&self, units: impl Iterator<Item = &'a str>, separator: &str) -> Vec<String> {
        let max = self.config.max_chunk_size;
        let separator_len = separator.chars().count();

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0;

        for unit in units {
            let unit = unit.trim();
            if unit.is_empty() {
                continue;
            }
            let unit_len = unit.chars().count();

            if buffer.is_empty() {
                buffer.push_str(unit);
                buffer_len = unit_len;
            } else if buffer_len + separator_len + unit_len <= max {
                buffer.push_str(separator);
                buffer.push_str(unit);
                buffer_len += separator_len + unit_len;
            } else {
                chunks.push(std::mem::take(&mut buffer));
                buffer.push_str(unit);
                buffer_len = unit_len;
            }
        }

        if !buffer.is_empty() {
            chunks.push(buffer);
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}
