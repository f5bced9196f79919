use generate::{Question, QuestionGenerator, QuestionSet, QuestionType, UsageTotals};
use ingest::{Chunker, FileReader};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::stats::DirectoryStats;

/// Longest slice of a failed response that is written to the log.
const RAW_RESPONSE_LOG_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub question_types: Vec<QuestionType>,
    pub questions_per_chunk: usize,
    pub max_chunk_size: usize,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0:#}")]
    Read(anyhow::Error),
    #[error("{} is empty", .0.display())]
    EmptyInput(PathBuf),
    #[error("no questions generated for {}", .0.display())]
    NoQuestions(PathBuf),
    #[error("failed to create output directory {}: {source}", .path.display())]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize question set: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What a successful file run produced.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub source_file: String,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub questions: usize,
    pub output_path: PathBuf,
}

/// Only the count is needed when re-reading a written question set.
#[derive(Deserialize)]
struct PersistedCount {
    #[serde(default)]
    total_questions: usize,
}

/// Turns text files into persisted question sets, one chunk at a time.
pub struct DocumentQuestionPipeline<G> {
    generator: G,
    chunker: Chunker,
    config: PipelineConfig,
    usage: UsageTotals,
}

impl<G: QuestionGenerator> DocumentQuestionPipeline<G> {
    pub fn new(generator: G, config: PipelineConfig) -> Self {
        Self {
            generator,
            chunker: Chunker::with_max_size(config.max_chunk_size),
            config,
            usage: UsageTotals::new(),
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Token usage of every generation call made so far.
    pub fn usage(&self) -> &UsageTotals {
        &self.usage
    }

    /// Where the question set for `source` is written.
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.config.output_dir.join(QuestionSet::file_name_for(&stem))
    }

    /// Generate and persist questions for one file. Failures are logged,
    /// never propagated.
    pub async fn process_file(&mut self, path: &Path) -> bool {
        match self.generate_for_file(path).await {
            Ok(_) => true,
            Err(e @ PipelineError::EmptyInput(_)) => {
                warn!(error = %e, "Skipping file");
                false
            }
            Err(e) => {
                error!(file = %path.display(), error = %e, "File failed");
                false
            }
        }
    }

    pub async fn generate_for_file(&mut self, path: &Path) -> Result<FileSummary, PipelineError> {
        let content = FileReader::read_file(path)
            .await
            .map_err(PipelineError::Read)?;

        if content.trim().is_empty() {
            return Err(PipelineError::EmptyInput(path.to_path_buf()));
        }

        let source_file = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let chunks = self.chunker.chunk_document(&source_file, &content);
        info!(file = %source_file, chunks = chunks.len(), "Processing file");

        let mut questions: Vec<Question> = Vec::new();
        let mut failed_chunks = 0;

        for chunk in &chunks {
            debug!(
                file = %source_file,
                chunk = chunk.index,
                of = chunks.len(),
                chunk_id = %chunk.chunk_id,
                chars = chunk.char_len(),
                "Generating questions"
            );

            let result = self
                .generator
                .generate(
                    &chunk.text,
                    &self.config.question_types,
                    self.config.questions_per_chunk,
                    &mut self.usage,
                )
                .await;

            match result.outcome {
                Ok(generated) => {
                    debug!(chunk = chunk.index, questions = generated.len(), "Chunk done");
                    questions.extend(
                        generated
                            .into_iter()
                            .map(|q| q.with_provenance(chunk.index, &source_file)),
                    );
                }
                Err(e) => {
                    failed_chunks += 1;
                    let raw: String = result.raw_response.chars().take(RAW_RESPONSE_LOG_CHARS).collect();
                    warn!(
                        file = %source_file,
                        chunk = chunk.index,
                        chunk_id = %chunk.chunk_id,
                        error = %e,
                        raw_response = %raw,
                        "Chunk failed"
                    );
                }
            }
        }

        if questions.is_empty() {
            return Err(PipelineError::NoQuestions(path.to_path_buf()));
        }

        let output_path = self.output_path_for(path);
        let question_set = QuestionSet::new(
            source_file.clone(),
            self.generator.model().to_string(),
            questions,
        );
        self.persist(&question_set, &output_path).await?;

        info!(
            file = %source_file,
            questions = question_set.total_questions,
            failed_chunks,
            output = %output_path.display(),
            "Questions written"
        );

        Ok(FileSummary {
            source_file,
            chunks: chunks.len(),
            failed_chunks,
            questions: question_set.total_questions,
            output_path,
        })
    }

    /// Process every `.txt` file directly inside `dir`.
    pub async fn process_directory(&mut self, dir: &Path) -> DirectoryStats {
        let mut stats = DirectoryStats::default();

        if !dir.is_dir() {
            error!(dir = %dir.display(), "Input directory not found");
            return stats;
        }

        let files = match FileReader::list_text_files(dir) {
            Ok(files) => files,
            Err(e) => {
                let reason = format!("{:#}", e);
                error!(dir = %dir.display(), error = %reason, "Cannot read input directory");
                return stats;
            }
        };

        if files.is_empty() {
            info!(dir = %dir.display(), "No .txt files found");
            return stats;
        }

        info!(files = files.len(), model = %self.generator.model(), "Starting question generation");

        for path in files {
            if self.process_file(&path).await {
                let written = self.count_persisted_questions(&self.output_path_for(&path)).await;
                stats.record_success(written);
            } else {
                stats.record_failure();
            }
        }

        stats
    }

    async fn persist(&self, question_set: &QuestionSet, output_path: &Path) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|source| PipelineError::CreateOutputDir {
                path: self.config.output_dir.clone(),
                source,
            })?;

        let json = serde_json::to_string_pretty(question_set)?;
        tokio::fs::write(output_path, json)
            .await
            .map_err(|source| PipelineError::Persist {
                path: output_path.to_path_buf(),
                source,
            })
    }

    /// Question count of a written set; unreadable files count as zero.
    async fn count_persisted_questions(&self, output_path: &Path) -> usize {
        let content = match tokio::fs::read_to_string(output_path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %output_path.display(), error = %e, "Cannot re-read question set");
                return 0;
            }
        };

        match serde_json::from_str::<PersistedCount>(&content) {
            Ok(persisted) => persisted.total_questions,
            Err(e) => {
                warn!(path = %output_path.display(), error = %e, "Cannot parse question set");
                0
            }
        }
    }
}
