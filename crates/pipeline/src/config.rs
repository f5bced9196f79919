use anyhow::{Context, Result};
use generate::{GenerationOptions, OllamaClient, QuestionType};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::processor::PipelineConfig;

const DEFAULT_TIMEOUT_SECS: f64 = 120.0;

/// Contents of `settings.json`. Every level falls back to defaults for
/// missing keys; unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ollama: OllamaSettings,
    pub question_generation: QuestionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    /// Request timeout in seconds
    pub timeout: f64,
    pub options: GenerationOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionSettings {
    #[serde(deserialize_with = "known_question_types")]
    pub question_types: Vec<QuestionType>,
    pub questions_per_chunk: usize,
    pub max_chunk_size: usize,
    pub text_input_dir: PathBuf,
    pub questions_output_dir: PathBuf,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            options: GenerationOptions::default(),
        }
    }
}

impl Default for QuestionSettings {
    fn default() -> Self {
        Self {
            question_types: QuestionType::ALL.to_vec(),
            questions_per_chunk: 4,
            max_chunk_size: 4000,
            text_input_dir: PathBuf::from("text_output"),
            questions_output_dir: PathBuf::from("questions_output"),
        }
    }
}

/// Unknown entries are dropped with a warning so one typo does not discard
/// the rest of the settings. If nothing usable remains, every type is used.
fn known_question_types<'de, D>(deserializer: D) -> std::result::Result<Vec<QuestionType>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;

    let mut types = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.as_str().map(str::parse::<QuestionType>) {
            Some(Ok(question_type)) => {
                if !types.contains(&question_type) {
                    types.push(question_type);
                }
            }
            _ => warn!(entry = %entry, "Ignoring unknown question type in settings"),
        }
    }

    if types.is_empty() {
        warn!("No usable question types configured, using all types");
        return Ok(QuestionType::ALL.to_vec());
    }
    Ok(types)
}

impl Settings {
    /// Load settings, falling back to defaults when the file is missing or
    /// cannot be parsed.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!(path = %path.display(), "Settings file not found, using defaults");
            return Self::default();
        }

        match Self::read(path) {
            Ok(settings) => settings,
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(path = %path.display(), error = %reason, "Invalid settings, using defaults");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read settings: {:?}", path))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse settings")
    }

    pub fn timeout(&self) -> Duration {
        let default = Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS);
        Duration::try_from_secs_f64(self.ollama.timeout).unwrap_or(default)
    }

    pub fn client(&self) -> OllamaClient {
        OllamaClient::new(self.ollama.base_url.clone(), self.ollama.model.clone())
            .with_options(self.ollama.options)
            .with_timeout(self.timeout())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let questions = &self.question_generation;
        PipelineConfig {
            output_dir: questions.questions_output_dir.clone(),
            question_types: questions.question_types.clone(),
            questions_per_chunk: questions.questions_per_chunk,
            max_chunk_size: questions.max_chunk_size,
        }
    }
}
