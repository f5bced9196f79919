pub mod llm;
pub mod parser;
pub mod prompt;
pub mod schema;
pub mod usage;

pub use llm::{GenerationOptions, OllamaClient, RawGeneration};
pub use schema::{Question, QuestionSet, QuestionType};
pub use usage::{TokenUsage, UsageTotals};

use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("request to generation service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no JSON array found in model response")]
    NoJsonArray,
    #[error("JSON parsing error: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl GenerationError {
    /// Transport-class failures never reached the model's output.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

/// Outcome of one chunk's generation attempt.
#[derive(Debug)]
pub struct GenerationResult {
    pub outcome: Result<Vec<Question>, GenerationError>,
    /// Model text as returned, kept for diagnosing parse failures
    pub raw_response: String,
    pub usage: TokenUsage,
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn questions(&self) -> &[Question] {
        match &self.outcome {
            Ok(questions) => questions,
            Err(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&GenerationError> {
        self.outcome.as_ref().err()
    }
}

/// Produces questions for one chunk of text.
///
/// Implementations fold the usage of every call into `totals`, including
/// calls that fail.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Model identifier recorded in persisted question sets.
    fn model(&self) -> &str;

    async fn generate(
        &self,
        chunk_text: &str,
        question_types: &[QuestionType],
        question_count: usize,
        totals: &mut UsageTotals,
    ) -> GenerationResult;
}

pub struct OllamaQuestionGenerator {
    client: OllamaClient,
}

impl OllamaQuestionGenerator {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QuestionGenerator for OllamaQuestionGenerator {
    fn model(&self) -> &str {
        self.client.model()
    }

    async fn generate(
        &self,
        chunk_text: &str,
        question_types: &[QuestionType],
        question_count: usize,
        totals: &mut UsageTotals,
    ) -> GenerationResult {
        let prompt = prompt::build_question_prompt(chunk_text, question_types, question_count);

        let raw = match self.client.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                // Nothing came back, so only the prompt side can be estimated
                let usage = TokenUsage::prompt_estimate(&prompt);
                totals.record(&usage);
                return GenerationResult {
                    outcome: Err(e),
                    raw_response: String::new(),
                    usage,
                };
            }
        };

        let usage = usage::extract_usage(&raw.body, &prompt, &raw.response_text);
        totals.record(&usage);
        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            estimated = usage.used_estimate,
            "Generation finished"
        );

        GenerationResult {
            outcome: parser::parse_questions(&raw.response_text),
            raw_response: raw.response_text,
            usage,
        }
    }
}
