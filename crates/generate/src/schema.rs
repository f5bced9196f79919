use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    TrueFalse,
    Essay,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::MultipleChoice,
        QuestionType::ShortAnswer,
        QuestionType::TrueFalse,
        QuestionType::Essay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::ShortAnswer => "short_answer",
            Self::TrueFalse => "true_false",
            Self::Essay => "essay",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the spellings models tend to produce: any case, with spaces,
/// hyphens or slashes in place of underscores, and an optional trailing
/// "question" (`"Short Answer Question"`).
impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if matches!(c, ' ' | '-' | '/') { '_' } else { c })
            .collect();
        let key = key
            .strip_suffix("_questions")
            .or_else(|| key.strip_suffix("_question"))
            .unwrap_or(&key);

        match key {
            "multiple_choice" | "multiplechoice" | "mcq" | "mc" => Ok(Self::MultipleChoice),
            "short_answer" | "shortanswer" | "short" => Ok(Self::ShortAnswer),
            "true_false" | "truefalse" | "true_or_false" | "tf" => Ok(Self::TrueFalse),
            "essay" | "long_answer" => Ok(Self::Essay),
            _ => Err(format!("unknown question type: {}", s)),
        }
    }
}

impl TryFrom<String> for QuestionType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    /// Answer choices, only ever filled for multiple choice
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    /// 1-based index of the chunk the question was generated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_chunk: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl Question {
    pub fn new(
        question_type: QuestionType,
        question: String,
        options: Vec<String>,
        correct_answer: String,
        explanation: String,
    ) -> Self {
        let options = match question_type {
            QuestionType::MultipleChoice => options,
            _ => Vec::new(),
        };

        Self {
            question_type,
            question,
            options,
            correct_answer,
            explanation,
            source_chunk: None,
            source_file: None,
        }
    }

    pub fn with_provenance(self, source_chunk: usize, source_file: &str) -> Self {
        Self {
            source_chunk: Some(source_chunk),
            source_file: Some(source_file.to_string()),
            ..self
        }
    }
}

/// The persisted result for one source text file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub source_file: String,
    pub generated_at: DateTime<Local>,
    pub total_questions: usize,
    pub model_used: String,
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn new(source_file: String, model_used: String, questions: Vec<Question>) -> Self {
        Self {
            source_file,
            generated_at: Local::now(),
            total_questions: questions.len(),
            model_used,
            questions,
        }
    }

    /// Output file name for a source file stem, e.g. `week1_questions.json`
    pub fn file_name_for(stem: &str) -> String {
        format!("{}_questions.json", stem)
    }
}
