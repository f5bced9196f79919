use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based position within the source document
    pub index: usize,
    pub chunk_id: String,
    pub text: String,
}

impl Chunk {
    pub fn new(source: &str, index: usize, text: String) -> Self {
        // Generate stable chunk_id from content
        let chunk_id = Self::generate_chunk_id(source, index, &text);

        Self {
            index,
            chunk_id,
            text,
        }
    }

    fn generate_chunk_id(source: &str, index: usize, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(index.to_string().as_bytes());
        hasher.update(text.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16]) // Use first 16 bytes (32 hex chars)
    }

    /// Length in characters, the unit the chunk size limit is expressed in
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
